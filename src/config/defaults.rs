//! Default values for configuration

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default collection name
pub fn default_collection_name() -> String {
    "documents_rag".to_string()
}

/// Default document registry base URL
pub fn default_registry_url() -> String {
    std::env::var("DOCCHAT_REGISTRY_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:5000/api/documents".to_string())
}

/// Default embedding model
pub fn default_embedding_model() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

/// Default embedding dimension (must match the model)
pub fn default_embedding_dimension() -> usize {
    384
}

/// Default batch size for embedding
pub fn default_embedding_batch_size() -> usize {
    32
}

/// Default embedding backend kind
pub fn default_embedding_backend() -> String {
    "http".to_string()
}

/// Default embedding backend URL
pub fn default_embedding_backend_url() -> String {
    std::env::var("DOCCHAT_EMBEDDING_BACKEND_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:7997".to_string())
}

/// Default sentences per chunk
pub fn default_chunk_max_sentences() -> usize {
    5
}

/// Default number of results after reranking
pub fn default_query_top_k() -> usize {
    3
}

/// Default number of dense candidates fetched before reranking
pub fn default_query_fetch_k() -> usize {
    10
}

/// Default reranker model (cross-encoder)
pub fn default_reranker_model() -> String {
    "BAAI/bge-reranker-base".to_string()
}

/// Default: reranker enabled
pub fn default_reranker_enabled() -> bool {
    true
}

/// Default generation service base URL (OpenAI-compatible)
pub fn default_generation_url() -> String {
    std::env::var("DOCCHAT_GENERATION_URL")
        .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string())
}

/// Default generation model
pub fn default_generation_model() -> String {
    "qwen/qwen-turbo".to_string()
}

/// Default environment variable holding the generation API key
pub fn default_generation_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

/// Default number of prior conversation turns included in the prompt
pub fn default_generation_history_turns() -> usize {
    6
}

/// Hard ceiling on stored memory per user, in characters
pub fn default_memory_max_chars() -> usize {
    4000
}

/// Target size when compacting memory, in characters
pub fn default_memory_summary_target_chars() -> usize {
    2500
}

/// Maximum length of one interaction snippet, in characters
pub fn default_memory_snippet_max_chars() -> usize {
    600
}
