//! Shared test doubles for integration tests

use async_trait::async_trait;
use docchat::embed::Embedder;
use docchat::error::Result;
use docchat::registry::{DocumentMeta, DocumentSource};
use docchat::rerank::{Reranker, RerankResult};
use std::collections::HashMap;

/// Deterministic bag-of-words embedding over 32 hash buckets.
///
/// Identical text maps to an identical vector and shared words raise cosine
/// similarity, which is all the retrieval tests rely on.
pub struct HashEmbedder;

pub fn hash_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; 32];
    for word in text.to_lowercase().split_whitespace() {
        let token: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
        if token.is_empty() {
            continue;
        }
        let bucket = token
            .bytes()
            .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
            % 32;
        vector[bucket] += 1.0;
    }
    vector
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }

    fn dimension(&self) -> usize {
        32
    }

    fn model_name(&self) -> &str {
        "hash-test"
    }
}

/// Cross-encoder double scoring by case-insensitive word overlap with the query
pub struct OverlapReranker;

#[async_trait]
impl Reranker for OverlapReranker {
    async fn rerank(&self, query: &str, documents: Vec<String>) -> Result<Vec<RerankResult>> {
        let query_words: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
            .collect();

        Ok(documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let doc_lower = doc.to_lowercase();
                let overlap = query_words
                    .iter()
                    .filter(|w| !w.is_empty() && doc_lower.contains(*w))
                    .count();
                RerankResult {
                    index,
                    score: overlap as f32,
                }
            })
            .collect())
    }

    fn model_name(&self) -> &str {
        "overlap-test"
    }
}

/// In-memory document source
pub struct StubSource {
    docs: Vec<DocumentMeta>,
    texts: HashMap<i64, String>,
}

impl StubSource {
    pub fn new(entries: &[(i64, &str, &str)]) -> Self {
        let docs = entries
            .iter()
            .map(|(id, name, _)| DocumentMeta {
                id: *id,
                name: name.to_string(),
                path: "/tmp".to_string(),
            })
            .collect();
        let texts = entries
            .iter()
            .map(|(id, _, text)| (*id, text.to_string()))
            .collect();
        Self { docs, texts }
    }
}

#[async_trait]
impl DocumentSource for StubSource {
    async fn list_documents(&self, limit: Option<usize>) -> Result<Vec<DocumentMeta>> {
        let mut docs = self.docs.clone();
        if let Some(limit) = limit {
            docs.truncate(limit);
        }
        Ok(docs)
    }

    async fn read_text(&self, doc: &DocumentMeta) -> Result<String> {
        Ok(self.texts.get(&doc.id).cloned().unwrap_or_default())
    }
}
