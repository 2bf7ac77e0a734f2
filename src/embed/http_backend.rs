use super::Embedder;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize)]
struct EmbedRequest {
    model: String,
    inputs: Vec<String>,
}

/// Accepts the common response shapes embedding servers use
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Embeddings { embeddings: Vec<Vec<f32>> },
    Vectors { vectors: Vec<Vec<f32>> },
    Data { data: Vec<EmbeddingData> },
}

#[derive(Debug, Clone, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbedResponse {
    fn into_embeddings(self) -> Vec<Vec<f32>> {
        match self {
            EmbedResponse::Embeddings { embeddings } => embeddings,
            EmbedResponse::Vectors { vectors } => vectors,
            EmbedResponse::Data { data } => data.into_iter().map(|d| d.embedding).collect(),
        }
    }
}

/// Embedder backed by an HTTP embedding server
pub struct HttpEmbedder {
    client: Client,
    base_url: Url,
    model_id: String,
    dimension: usize,
    retries: usize,
}

impl HttpEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let base_url = Url::parse(&config.backend_url)
            .map_err(|e| Error::Config(format!("Invalid embedding backend URL: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url,
            model_id: config.model.clone(),
            dimension: config.resolved_dimension(),
            retries: 1,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("Invalid embedding backend URL: {}", e)))
    }

    fn validate_dimensions(&self, embeddings: &[Vec<f32>]) -> Result<()> {
        if let Some(mismatch) = embeddings.iter().find(|vec| vec.len() != self.dimension) {
            return Err(Error::Embedding(format!(
                "Embedding dimension mismatch for model '{}': expected {}, got {}",
                self.model_id,
                self.dimension,
                mismatch.len()
            )));
        }
        Ok(())
    }

    async fn send_with_retry(&self, url: Url, request: &EmbedRequest) -> Result<EmbedResponse> {
        let mut last_err: Option<Error> = None;
        for attempt in 0..=self.retries {
            let send = self.client.post(url.clone()).json(request).send().await;
            match send {
                Ok(response) => match response.error_for_status() {
                    Ok(ok) => return Ok(ok.json::<EmbedResponse>().await?),
                    Err(e) => last_err = Some(Error::Embedding(e.to_string())),
                },
                Err(e) => last_err = Some(Error::Embedding(e.to_string())),
            }

            if attempt < self.retries {
                tokio::time::sleep(Duration::from_millis(200 * (attempt + 1) as u64)).await;
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::Embedding("Embedding backend request failed".to_string())))
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.endpoint("/v1/embed/text")?;
        let request = EmbedRequest {
            model: self.model_id.clone(),
            inputs: texts,
        };

        let parsed = self.send_with_retry(url, &request).await?;
        let embeddings = parsed.into_embeddings();
        self.validate_dimensions(&embeddings)?;
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
