//! Cross-encoder reranking of retrieval candidates

mod http_backend;

pub use http_backend::*;

#[cfg(feature = "local-embed")]
mod fastembed_impl;

#[cfg(feature = "local-embed")]
pub use fastembed_impl::*;

use crate::config::RerankerConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;

/// One scored (query, document) pair; `index` refers to the input document order
#[derive(Debug, Clone)]
pub struct RerankResult {
    pub index: usize,
    pub score: f32,
}

#[async_trait]
pub trait Reranker: Send + Sync {
    /// Score every (query, document) pair; order of the output is unspecified
    async fn rerank(&self, query: &str, documents: Vec<String>) -> Result<Vec<RerankResult>>;

    fn model_name(&self) -> &str;
}

/// Create a reranker based on configuration
pub fn create_reranker(config: &RerankerConfig) -> Result<Box<dyn Reranker>> {
    match config.backend.as_str() {
        "http" => Ok(Box::new(HttpReranker::new(config)?)),
        #[cfg(feature = "local-embed")]
        "local" => Ok(Box::new(FastEmbedReranker::new(config)?)),
        #[cfg(not(feature = "local-embed"))]
        "local" => Err(Error::Config(
            "Reranker backend 'local' requires the local-embed feature".to_string(),
        )),
        other => Err(Error::Config(format!(
            "Unsupported reranker backend '{}'",
            other
        ))),
    }
}
