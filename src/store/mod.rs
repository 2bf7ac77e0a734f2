//! Vector index integration
//!
//! This module defines the vector index abstraction and its Qdrant
//! implementation:
//! - Collection management (cosine distance, one dimension per collection)
//! - Point upsert and similarity search
//! - Paginated scan of indexed document ids
//!
//! Point ids are numeric and strictly increasing across the lifetime of a
//! collection; ingestion allocates the next free range from `count()`.

mod memory;

pub use memory::*;

use crate::error::{Error, Result};
use async_trait::async_trait;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointId, PointStruct, ScrollPointsBuilder,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use std::collections::HashSet;
use tracing::{debug, info};

/// Payload carried by every indexed point
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPayload {
    pub doc_id: i64,
    pub chunk_index: i64,
    pub text: String,
    pub title: String,
}

/// One vector plus payload, addressed by a numeric point id
#[derive(Debug, Clone)]
pub struct IndexPoint {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

/// One similarity search hit, ordered by descending score
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub score: f32,
    pub payload: ChunkPayload,
}

/// Abstraction over the vector store
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the backing collection if absent; idempotent
    async fn ensure_collection(&self) -> Result<()>;

    /// Insert-or-replace points by id; safe to repeat with the same ids
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()>;

    /// Nearest-neighbor search, results sorted by descending similarity
    async fn search(&self, query_vector: Vec<f32>, limit: usize) -> Result<Vec<SearchHit>>;

    /// Every doc_id currently present in the collection (paginated scan)
    async fn scan_known_doc_ids(&self) -> Result<HashSet<i64>>;

    /// Current number of points
    async fn count(&self) -> Result<u64>;
}

/// Qdrant-backed vector index
pub struct QdrantIndex {
    client: Qdrant,
    collection: String,
    dimension: usize,
}

impl QdrantIndex {
    /// Connect to Qdrant; the index is bound to one collection and dimension
    pub fn new(url: &str, collection: &str, dimension: usize) -> Result<Self> {
        debug!("Connecting to Qdrant at {}", url);

        let client = Qdrant::from_url(url)
            .skip_compatibility_check()
            .build()
            .map_err(|e| Error::Index(e.to_string()))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
            dimension,
        })
    }

    /// The vector dimension this index is bound to
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn check_dimensions(&self, points: &[IndexPoint]) -> Result<()> {
        if let Some(mismatch) = points.iter().find(|p| p.vector.len() != self.dimension) {
            return Err(Error::Index(format!(
                "Vector dimension mismatch for collection '{}': expected {}, got {}",
                self.collection,
                self.dimension,
                mismatch.vector.len()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn ensure_collection(&self) -> Result<()> {
        let exists = self.client.collection_exists(&self.collection).await?;

        if exists {
            debug!("Collection {} already exists", self.collection);
            return Ok(());
        }

        info!(
            "Creating collection {} with dimension {}",
            self.collection, self.dimension
        );

        let vectors_config = VectorParamsBuilder::new(self.dimension as u64, Distance::Cosine);

        self.client
            .create_collection(
                CreateCollectionBuilder::new(&self.collection).vectors_config(vectors_config),
            )
            .await?;

        info!("Collection {} created successfully", self.collection);
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        self.check_dimensions(&points)?;

        debug!(
            "Upserting {} points to collection {}",
            points.len(),
            self.collection
        );

        let point_structs: Vec<PointStruct> = points.into_iter().map(to_point_struct).collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(&self.collection, point_structs))
            .await?;

        Ok(())
    }

    async fn search(&self, query_vector: Vec<f32>, limit: usize) -> Result<Vec<SearchHit>> {
        debug!(
            "Searching collection {} with limit {}",
            self.collection, limit
        );

        let search_builder = SearchPointsBuilder::new(&self.collection, query_vector, limit as u64)
            .with_payload(true);

        let response = self.client.search_points(search_builder).await?;

        let hits = response
            .result
            .into_iter()
            .map(|p| SearchHit {
                score: p.score,
                payload: payload_from_map(&p.payload),
            })
            .collect();

        Ok(hits)
    }

    async fn scan_known_doc_ids(&self) -> Result<HashSet<i64>> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(HashSet::new());
        }

        let mut doc_ids = HashSet::new();
        let mut offset: Option<PointId> = None;
        let batch_size = 1000u32;

        loop {
            let mut scroll_builder = ScrollPointsBuilder::new(&self.collection)
                .limit(batch_size)
                .with_payload(true)
                .with_vectors(false);

            if let Some(ref o) = offset {
                scroll_builder = scroll_builder.offset(o.clone());
            }

            let response = self.client.scroll(scroll_builder).await?;

            let points = response.result;
            if points.is_empty() {
                break;
            }

            for point in &points {
                if let Some(doc_id) = map_i64(&point.payload, "doc_id") {
                    doc_ids.insert(doc_id);
                }
            }

            offset = response.next_page_offset;
            if offset.is_none() {
                break;
            }
        }

        Ok(doc_ids)
    }

    async fn count(&self) -> Result<u64> {
        if !self.client.collection_exists(&self.collection).await? {
            return Ok(0);
        }

        let info = self.client.collection_info(&self.collection).await?;
        let count = info
            .result
            .and_then(|r| r.points_count)
            .unwrap_or(0);
        Ok(count)
    }
}

fn to_point_struct(point: IndexPoint) -> PointStruct {
    let mut payload = Payload::new();
    payload.insert("doc_id", point.payload.doc_id);
    payload.insert("chunk_index", point.payload.chunk_index);
    payload.insert("text", point.payload.text);
    payload.insert("title", point.payload.title);

    PointStruct::new(point.id, point.vector, payload)
}

fn payload_from_map(
    map: &std::collections::HashMap<String, qdrant_client::qdrant::Value>,
) -> ChunkPayload {
    ChunkPayload {
        doc_id: map_i64(map, "doc_id").unwrap_or_default(),
        chunk_index: map_i64(map, "chunk_index").unwrap_or_default(),
        text: map_str(map, "text"),
        title: map_str(map, "title"),
    }
}

fn map_i64(
    map: &std::collections::HashMap<String, qdrant_client::qdrant::Value>,
    key: &str,
) -> Option<i64> {
    use qdrant_client::qdrant::value::Kind;

    match map.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::IntegerValue(i)) => Some(*i),
        Some(Kind::DoubleValue(d)) => Some(*d as i64),
        Some(Kind::StringValue(s)) => s.parse().ok(),
        _ => None,
    }
}

fn map_str(
    map: &std::collections::HashMap<String, qdrant_client::qdrant::Value>,
    key: &str,
) -> String {
    use qdrant_client::qdrant::value::Kind;

    match map.get(key).and_then(|v| v.kind.as_ref()) {
        Some(Kind::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_rejects_dimension_mismatch() {
        let index =
            QdrantIndex::new("http://127.0.0.1:6334", "test_collection", 3).expect("client");

        let point = IndexPoint {
            id: 1,
            vector: vec![0.1, 0.2],
            payload: ChunkPayload {
                doc_id: 7,
                chunk_index: 0,
                text: "hello".to_string(),
                title: "greeting".to_string(),
            },
        };

        let err = index
            .upsert(vec![point])
            .await
            .expect_err("should reject mismatched vector length");

        match err {
            Error::Index(message) => assert!(message.contains("dimension mismatch")),
            other => panic!("expected index error, got {other:?}"),
        }
    }
}
