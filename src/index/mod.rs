//! Incremental document ingestion
//!
//! The indexer fetches registered documents, chunks and embeds the ones not
//! yet indexed, and upserts the staged points in one batch at the end of the
//! run. Deduplication keys on doc_id only: editing a document's content
//! without changing its id requires `force_reindex` to pick up the change.
//!
//! Point ids are allocated sequentially across the whole batch starting at
//! `count() + 1`, so a run never collides with points already present.
//! Two ingestion runs started from the same count snapshot can collide;
//! callers must serialize runs per collection.

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embed::{embed_in_batches, embed_one, Embedder};
use crate::error::Result;
use crate::progress;
use crate::registry::DocumentSource;
use crate::store::{ChunkPayload, IndexPoint, VectorIndex};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Points per upsert call; keeps single requests bounded
const UPSERT_BATCH: usize = 256;

/// Options for one build run
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Cap on the number of documents listed from the registry
    pub limit: Option<usize>,
    /// Re-embed documents that are already indexed
    pub force_reindex: bool,
}

/// Outcome of one build run
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    pub docs_processed: usize,
    pub docs_skipped: usize,
    pub docs_failed: usize,
    pub points_written: usize,
    /// Recorded warnings for skipped documents and chunks
    pub errors: Vec<String>,
}

/// Run one ingestion pass over the registry.
///
/// A failed upsert aborts the run with nothing marked indexed; the whole
/// batch is retryable. Documents yielding no text and chunks that fail to
/// embed are skipped with a recorded warning.
pub async fn build_index(
    source: &dyn DocumentSource,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    config: &Config,
    options: &IndexOptions,
) -> Result<BuildStats> {
    let docs = source.list_documents(options.limit).await?;
    info!("Indexing batch of {} documents", docs.len());

    index.ensure_collection().await?;

    let known = index.scan_known_doc_ids().await?;
    let mut next_id = index.count().await? + 1;

    let mut stats = BuildStats::default();
    let mut staged: Vec<IndexPoint> = Vec::new();

    let bar = progress::add_progress_bar(docs.len() as u64);
    bar.set_message("embedding documents");

    for doc in &docs {
        bar.inc(1);

        if known.contains(&doc.id) && !options.force_reindex {
            debug!("Document {} already indexed, skipping", doc.id);
            stats.docs_skipped += 1;
            continue;
        }

        let text = match source.read_text(doc).await {
            Ok(text) => text,
            Err(e) => {
                let message = format!("Could not read document {} ({}): {}", doc.id, doc.name, e);
                warn!("{}, skipping", message);
                stats.errors.push(message);
                stats.docs_failed += 1;
                continue;
            }
        };
        let chunks = chunk_text(&text, &config.chunk);
        if chunks.is_empty() {
            let message = format!("Document {} ({}) yielded no text", doc.id, doc.name);
            warn!("{}, skipping", message);
            stats.errors.push(message);
            stats.docs_failed += 1;
            continue;
        }

        let embedded = embed_chunks(embedder, doc.id, chunks, config, &mut stats).await;
        if embedded.is_empty() {
            stats.docs_failed += 1;
            continue;
        }

        for (chunk_index, (chunk, vector)) in embedded.into_iter().enumerate() {
            staged.push(IndexPoint {
                id: next_id,
                vector,
                payload: ChunkPayload {
                    doc_id: doc.id,
                    chunk_index: chunk_index as i64,
                    text: chunk,
                    title: doc.name.clone(),
                },
            });
            next_id += 1;
        }
        stats.docs_processed += 1;
    }

    bar.finish_and_clear();

    stats.points_written = staged.len();
    for batch in staged.chunks(UPSERT_BATCH) {
        index.upsert(batch.to_vec()).await?;
    }

    info!(
        "Build complete: {} processed, {} skipped, {} failed, {} points",
        stats.docs_processed, stats.docs_skipped, stats.docs_failed, stats.points_written
    );
    Ok(stats)
}

/// Embed a document's chunks, skipping individual chunks that fail.
///
/// The batch call is tried first; on failure each chunk is embedded alone so
/// one bad chunk cannot take the document (or the batch) down with it.
async fn embed_chunks(
    embedder: &dyn Embedder,
    doc_id: i64,
    chunks: Vec<String>,
    config: &Config,
    stats: &mut BuildStats,
) -> Vec<(String, Vec<f32>)> {
    match embed_in_batches(embedder, chunks.clone(), config.embedding.batch_size).await {
        Ok(embeddings) if embeddings.len() == chunks.len() => {
            chunks.into_iter().zip(embeddings).collect()
        }
        Ok(embeddings) => {
            let message = format!(
                "Embedding count mismatch for document {}: {} chunks, {} vectors",
                doc_id,
                chunks.len(),
                embeddings.len()
            );
            warn!("{}", message);
            stats.errors.push(message);
            Vec::new()
        }
        Err(batch_err) => {
            debug!(
                "Batch embedding failed for document {} ({}), retrying per chunk",
                doc_id, batch_err
            );
            let mut kept = Vec::new();
            for chunk in chunks {
                match embed_one(embedder, &chunk).await {
                    Ok(vector) => kept.push((chunk, vector)),
                    Err(e) => {
                        let message =
                            format!("Skipping chunk of document {}: embedding failed: {}", doc_id, e);
                        warn!("{}", message);
                        stats.errors.push(message);
                    }
                }
            }
            kept
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::registry::DocumentMeta;
    use crate::store::MemoryIndex;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StubRegistry {
        docs: Vec<DocumentMeta>,
        texts: HashMap<i64, String>,
    }

    impl StubRegistry {
        fn new(entries: &[(i64, &str, &str)]) -> Self {
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
    impl DocumentSource for StubRegistry {
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

    /// Embeds deterministically; any text containing "poison" fails
    struct PoisonEmbedder;

    #[async_trait]
    impl Embedder for PoisonEmbedder {
        async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
            if let Some(bad) = texts.iter().find(|t| t.contains("poison")) {
                return Err(Error::Embedding(format!("cannot embed {:?}", bad)));
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "poison-test"
        }
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.chunk.max_sentences = 1;
        config
    }

    #[tokio::test]
    async fn test_build_indexes_new_documents() {
        let registry = StubRegistry::new(&[
            (1, "a.txt", "First sentence. Second sentence."),
            (2, "b.txt", "Only one here."),
        ]);
        let index = MemoryIndex::new(2);

        let stats = build_index(
            &registry,
            &PoisonEmbedder,
            &index,
            &test_config(),
            &IndexOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(stats.docs_processed, 2);
        assert_eq!(stats.points_written, 3);
        assert_eq!(index.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_second_build_indexes_nothing() {
        let registry = StubRegistry::new(&[(1, "a.txt", "Alpha. Beta."), (2, "b.txt", "Gamma.")]);
        let index = MemoryIndex::new(2);
        let config = test_config();

        build_index(&registry, &PoisonEmbedder, &index, &config, &IndexOptions::default())
            .await
            .unwrap();
        let count_after_first = index.count().await.unwrap();

        let stats = build_index(
            &registry,
            &PoisonEmbedder,
            &index,
            &config,
            &IndexOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(stats.docs_processed, 0);
        assert_eq!(stats.docs_skipped, 2);
        assert_eq!(stats.points_written, 0);
        assert_eq!(index.count().await.unwrap(), count_after_first);
    }

    #[tokio::test]
    async fn test_force_reindex_grows_monotonically() {
        let registry = StubRegistry::new(&[(1, "a.txt", "Alpha. Beta.")]);
        let index = MemoryIndex::new(2);
        let config = test_config();

        build_index(&registry, &PoisonEmbedder, &index, &config, &IndexOptions::default())
            .await
            .unwrap();
        assert_eq!(index.count().await.unwrap(), 2);

        let stats = build_index(
            &registry,
            &PoisonEmbedder,
            &index,
            &config,
            &IndexOptions {
                force_reindex: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // New points are added without deleting the old generation
        assert_eq!(stats.docs_processed, 1);
        assert_eq!(index.count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_empty_document_skipped_with_warning() {
        let registry = StubRegistry::new(&[(1, "empty.txt", "   \n\t "), (2, "b.txt", "Fine.")]);
        let index = MemoryIndex::new(2);

        let stats = build_index(
            &registry,
            &PoisonEmbedder,
            &index,
            &test_config(),
            &IndexOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(stats.docs_failed, 1);
        assert_eq!(stats.docs_processed, 1);
        assert_eq!(stats.errors.len(), 1);
        assert!(stats.errors[0].contains("yielded no text"));
    }

    #[tokio::test]
    async fn test_failing_chunk_does_not_abort_document() {
        let registry = StubRegistry::new(&[(1, "a.txt", "Good sentence. This one is poison.")]);
        let index = MemoryIndex::new(2);

        let stats = build_index(
            &registry,
            &PoisonEmbedder,
            &index,
            &test_config(),
            &IndexOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(stats.docs_processed, 1);
        assert_eq!(stats.points_written, 1);
        assert_eq!(stats.errors.len(), 1);
        assert!(stats.errors[0].contains("embedding failed"));
    }

    #[tokio::test]
    async fn test_limit_caps_listing() {
        let registry = StubRegistry::new(&[
            (1, "a.txt", "One."),
            (2, "b.txt", "Two."),
            (3, "c.txt", "Three."),
        ]);
        let index = MemoryIndex::new(2);

        let stats = build_index(
            &registry,
            &PoisonEmbedder,
            &index,
            &test_config(),
            &IndexOptions {
                limit: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(stats.docs_processed, 2);
    }
}
