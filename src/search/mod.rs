//! Two-stage retrieval: dense search plus cross-encoder reranking
//!
//! Dense retrieval over-fetches a candidate set, then a cross-encoder scores
//! every (query, candidate) pair and the best K survive. Dense retrieval
//! alone has lower precision at the top; the reranker corrects ordering at
//! acceptable cost because it only sees the small over-fetched set. A rerank
//! failure falls back to the dense ordering rather than failing the query.

use crate::config::QueryConfig;
use crate::embed::{embed_one, Embedder};
use crate::error::Result;
use crate::rerank::Reranker;
use crate::store::VectorIndex;
use serde::Serialize;
use tracing::{debug, warn};

/// One retrieved chunk of context
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub doc_id: i64,
    pub text: String,
    pub score: f32,
}

/// Retrieve the top `top_k` chunks for a query.
///
/// Fetches `fetch_for(top_k)` dense candidates, reranks them when a reranker
/// is available, and truncates to `top_k`. Ties in reranker score are broken
/// by the original retrieval rank.
pub async fn search_and_rerank(
    embedder: &dyn Embedder,
    reranker: Option<&dyn Reranker>,
    index: &dyn VectorIndex,
    query_config: &QueryConfig,
    query: &str,
    top_k: usize,
) -> Result<Vec<RetrievedChunk>> {
    let query_vector = embed_one(embedder, query).await?;

    let fetch = query_config.fetch_for(top_k);
    let hits = index.search(query_vector, fetch).await?;
    debug!("Dense retrieval returned {} candidates", hits.len());

    let candidates: Vec<RetrievedChunk> = hits
        .into_iter()
        .map(|hit| RetrievedChunk {
            doc_id: hit.payload.doc_id,
            text: hit.payload.text,
            score: hit.score,
        })
        .collect();

    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let Some(reranker) = reranker else {
        return Ok(truncated(candidates, top_k));
    };

    let documents: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
    match reranker.rerank(query, documents).await {
        Ok(mut scores) if !scores.is_empty() => {
            // Highest reranker score first; original rank breaks ties
            scores.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.index.cmp(&b.index))
            });

            let mut selected = Vec::with_capacity(top_k);
            for result in scores {
                if let Some(candidate) = candidates.get(result.index) {
                    selected.push(RetrievedChunk {
                        doc_id: candidate.doc_id,
                        text: candidate.text.clone(),
                        score: result.score,
                    });
                    if selected.len() == top_k {
                        break;
                    }
                }
            }

            if selected.is_empty() {
                warn!("Reranker returned no usable indices, using dense ordering");
                return Ok(truncated(candidates, top_k));
            }
            Ok(selected)
        }
        Ok(_) => {
            warn!("Reranker returned no scores, using dense ordering");
            Ok(truncated(candidates, top_k))
        }
        Err(e) => {
            warn!("Reranking failed, using dense ordering: {}", e);
            Ok(truncated(candidates, top_k))
        }
    }
}

fn truncated(mut candidates: Vec<RetrievedChunk>, top_k: usize) -> Vec<RetrievedChunk> {
    candidates.truncate(top_k);
    candidates
}
