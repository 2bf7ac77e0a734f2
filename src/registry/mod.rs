//! Document registry collaborator
//!
//! The registry owns document metadata: docchat only lists documents over
//! HTTP and reads their extracted text from disk. Text extraction for rich
//! formats happens upstream; here a document is whatever UTF-8 the file
//! holds, read lossily so one bad byte sequence never fails a batch.

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// One registered document as the registry reports it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
}

impl DocumentMeta {
    /// Filesystem location of the extracted text, if the registry gave one
    pub fn file_path(&self) -> Option<PathBuf> {
        if self.path.is_empty() || self.name.is_empty() {
            return None;
        }
        Some(Path::new(&self.path).join(&self.name))
    }
}

/// Source of documents for indexing
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// List registered documents, optionally capped at `limit`
    async fn list_documents(&self, limit: Option<usize>) -> Result<Vec<DocumentMeta>>;

    /// Read a document's extracted text; empty string when unreadable
    async fn read_text(&self, doc: &DocumentMeta) -> Result<String>;
}

/// HTTP document registry client reading text from the shared filesystem
pub struct HttpRegistry {
    client: Client,
    base_url: Url,
}

impl HttpRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid registry URL: {}", e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl DocumentSource for HttpRegistry {
    async fn list_documents(&self, limit: Option<usize>) -> Result<Vec<DocumentMeta>> {
        let mut request = self.client.get(self.base_url.clone());
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Registry(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::Registry(e.to_string()))?;

        let docs = response
            .json::<Vec<DocumentMeta>>()
            .await
            .map_err(|e| Error::Registry(e.to_string()))?;

        debug!("Registry listed {} documents", docs.len());
        Ok(docs)
    }

    async fn read_text(&self, doc: &DocumentMeta) -> Result<String> {
        let Some(path) = doc.file_path() else {
            warn!("Document {} has no path, treating as empty", doc.id);
            return Ok(String::new());
        };

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                warn!("Could not read {:?} for document {}: {}", path, doc.id, e);
                Ok(String::new())
            }
        }
    }
}
