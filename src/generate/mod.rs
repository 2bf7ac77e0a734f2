//! Text-generation collaborator (OpenAI-compatible chat completions)
//!
//! The generation service is opaque to the pipeline: it receives the
//! assembled message list and returns text plus optional reasoning metadata.
//! Callers convert failures into a degraded textual reply; nothing here ever
//! reaches the user as an unhandled crash.

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::prompt::ChatMessage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Output of one completion call
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub content: String,
    /// Reasoning metadata, passed through untouched when the service sends it
    pub reasoning: Option<Value>,
}

/// Trait for text-generation providers
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply for the assembled messages; tolerates zero prior turns
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion>;

    fn model_name(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    reasoning: ReasoningOptions,
}

#[derive(Debug, Serialize)]
struct ReasoningOptions {
    enabled: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    reasoning_details: Option<Value>,
}

/// Generator backed by an OpenAI-compatible HTTP service
pub struct HttpGenerator {
    client: Client,
    base_url: Url,
    model: String,
    api_key: Option<String>,
}

impl HttpGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid generation URL: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        let api_key = if config.api_key_env.is_empty() {
            None
        } else {
            std::env::var(&config.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
        };

        Ok(Self {
            client,
            base_url,
            model: config.model.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Completion> {
        let url = self
            .base_url
            .join("chat/completions")
            .map_err(|e| Error::Config(format!("Invalid generation URL: {}", e)))?;

        let request = CompletionRequest {
            model: &self.model,
            messages,
            reasoning: ReasoningOptions { enabled: true },
        };

        debug!("Requesting completion with {} messages", messages.len());

        let mut builder = self.client.post(url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Generation(e.to_string()))?;

        let parsed = response
            .json::<CompletionResponse>()
            .await
            .map_err(|e| Error::Generation(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Generation("No choices in completion response".to_string()))?;

        Ok(Completion {
            content: choice.message.content,
            reasoning: choice.message.reasoning_details,
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
