//! HTTP backend tests against wiremock servers

use docchat::config::{EmbeddingConfig, GenerationConfig, RegistryConfig, RerankerConfig};
use docchat::embed::{Embedder, HttpEmbedder};
use docchat::generate::{Generator, HttpGenerator};
use docchat::prompt::ChatMessage;
use docchat::registry::{DocumentSource, HttpRegistry};
use docchat::rerank::{HttpReranker, Reranker};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn embed_config(url: &str) -> EmbeddingConfig {
    EmbeddingConfig {
        model: "test-model".to_string(),
        dimension: 3,
        backend_url: url.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn http_embedder_parses_embeddings() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embed/text"))
        .and(body_partial_json(json!({ "model": "test-model" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]]
        })))
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(&embed_config(&server.uri())).unwrap();
    let vectors = embedder
        .embed(vec!["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn http_embedder_accepts_openai_response_shape() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embed/text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": [1.0, 0.0, 0.0] }]
        })))
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(&embed_config(&server.uri())).unwrap();
    let vectors = embedder.embed(vec!["only".to_string()]).await.unwrap();

    assert_eq!(vectors, vec![vec![1.0, 0.0, 0.0]]);
}

#[tokio::test]
async fn http_embedder_rejects_wrong_dimension() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embed/text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[0.1, 0.2]]
        })))
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(&embed_config(&server.uri())).unwrap();
    let err = embedder
        .embed(vec!["text".to_string()])
        .await
        .expect_err("two floats where three belong");

    assert!(err.to_string().contains("dimension mismatch"));
}

#[tokio::test]
async fn http_embedder_surfaces_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embed/text"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let embedder = HttpEmbedder::new(&embed_config(&server.uri())).unwrap();
    assert!(embedder.embed(vec!["text".to_string()]).await.is_err());
}

#[tokio::test]
async fn http_reranker_parses_scores() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/rerank"))
        .and(body_partial_json(json!({ "query": "which one" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "index": 1, "score": 0.9 },
                { "index": 0, "score": 0.2 }
            ]
        })))
        .mount(&server)
        .await;

    let config = RerankerConfig {
        backend_url: server.uri(),
        ..Default::default()
    };
    let reranker = HttpReranker::new(&config).unwrap();
    let results = reranker
        .rerank("which one", vec!["a".to_string(), "b".to_string()])
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].index, 1);
    assert!((results[0].score - 0.9).abs() < f32::EPSILON);
}

#[tokio::test]
async fn http_generator_returns_content_and_reasoning() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "reasoning": { "enabled": true } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "content": "The sky is blue.",
                    "reasoning_details": { "steps": 2 }
                }
            }]
        })))
        .mount(&server)
        .await;

    let config = GenerationConfig {
        base_url: server.uri(),
        api_key_env: String::new(),
        ..Default::default()
    };
    let generator = HttpGenerator::new(&config).unwrap();
    let completion = generator
        .complete(&[ChatMessage::user("what color is the sky?")])
        .await
        .unwrap();

    assert_eq!(completion.content, "The sky is blue.");
    assert_eq!(completion.reasoning.unwrap()["steps"], 2);
}

#[tokio::test]
async fn http_generator_errors_without_choices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let config = GenerationConfig {
        base_url: server.uri(),
        api_key_env: String::new(),
        ..Default::default()
    };
    let generator = HttpGenerator::new(&config).unwrap();

    assert!(generator
        .complete(&[ChatMessage::user("hello")])
        .await
        .is_err());
}

#[tokio::test]
async fn registry_lists_documents_and_reads_text() {
    let server = MockServer::start().await;
    let docs_dir = tempfile::TempDir::new().unwrap();
    std::fs::write(docs_dir.path().join("manual.txt"), "Open the valve slowly.").unwrap();

    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": 1,
                "name": "manual.txt",
                "path": docs_dir.path().to_str().unwrap()
            },
            { "id": 2, "name": "missing.txt", "path": docs_dir.path().to_str().unwrap() },
            { "id": 3, "name": "", "path": "" }
        ])))
        .mount(&server)
        .await;

    let config = RegistryConfig {
        base_url: format!("{}/api/documents", server.uri()),
    };
    let registry = HttpRegistry::new(&config).unwrap();

    let docs = registry.list_documents(None).await.unwrap();
    assert_eq!(docs.len(), 3);

    // Readable file comes back verbatim
    let text = registry.read_text(&docs[0]).await.unwrap();
    assert_eq!(text, "Open the valve slowly.");

    // Missing file and pathless entry degrade to empty text, not errors
    assert_eq!(registry.read_text(&docs[1]).await.unwrap(), "");
    assert_eq!(registry.read_text(&docs[2]).await.unwrap(), "");
}

#[tokio::test]
async fn registry_passes_limit_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/documents/"))
        .and(wiremock::matchers::query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "a.txt", "path": "/tmp" },
            { "id": 2, "name": "b.txt", "path": "/tmp" }
        ])))
        .mount(&server)
        .await;

    let config = RegistryConfig {
        base_url: format!("{}/api/documents", server.uri()),
    };
    let registry = HttpRegistry::new(&config).unwrap();

    let docs = registry.list_documents(Some(2)).await.unwrap();
    assert_eq!(docs.len(), 2);
}
