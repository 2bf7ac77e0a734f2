//! In-memory [`VectorIndex`] implementation for tests and offline use.
//!
//! Points live in a `BTreeMap` behind `std::sync::RwLock`; search is
//! brute-force cosine similarity over all stored vectors.

use super::{IndexPoint, SearchHit, VectorIndex};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

/// In-memory vector index
pub struct MemoryIndex {
    points: RwLock<BTreeMap<u64, IndexPoint>>,
    dimension: usize,
}

impl MemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            points: RwLock::new(BTreeMap::new()),
            dimension,
        }
    }
}

fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_collection(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if let Some(mismatch) = points.iter().find(|p| p.vector.len() != self.dimension) {
            return Err(Error::Index(format!(
                "Vector dimension mismatch: expected {}, got {}",
                self.dimension,
                mismatch.vector.len()
            )));
        }

        let mut stored = self.points.write().unwrap();
        for point in points {
            stored.insert(point.id, point);
        }
        Ok(())
    }

    async fn search(&self, query_vector: Vec<f32>, limit: usize) -> Result<Vec<SearchHit>> {
        let stored = self.points.read().unwrap();
        let mut hits: Vec<(u64, SearchHit)> = stored
            .values()
            .map(|p| {
                (
                    p.id,
                    SearchHit {
                        score: cosine_sim(&query_vector, &p.vector),
                        payload: p.payload.clone(),
                    },
                )
            })
            .collect();

        // Descending score, point id as the deterministic tie-break
        hits.sort_by(|(id_a, a), (id_b, b)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(id_a.cmp(id_b))
        });
        hits.truncate(limit);

        Ok(hits.into_iter().map(|(_, hit)| hit).collect())
    }

    async fn scan_known_doc_ids(&self) -> Result<HashSet<i64>> {
        let stored = self.points.read().unwrap();
        Ok(stored.values().map(|p| p.payload.doc_id).collect())
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.points.read().unwrap().len() as u64)
    }
}
