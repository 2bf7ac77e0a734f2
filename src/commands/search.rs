//! Search command implementation

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::rerank::Reranker;
use crate::search::{search_and_rerank, RetrievedChunk};
use crate::store::VectorIndex;
use serde::Serialize;
use tracing::info;

/// Search result for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub query: String,
    pub results: Vec<RetrievedChunk>,
}

/// Execute a retrieval query against the index
pub async fn cmd_search(
    config: &Config,
    embedder: &dyn Embedder,
    reranker: Option<&dyn Reranker>,
    index: &dyn VectorIndex,
    question: &str,
    top_k: Option<usize>,
) -> Result<SearchOutcome> {
    info!("Searching: {}", question);

    let k = top_k.unwrap_or(config.query.top_k);
    let results = search_and_rerank(embedder, reranker, index, &config.query, question, k).await?;

    info!("Returning {} results", results.len());

    Ok(SearchOutcome {
        query: question.to_string(),
        results,
    })
}

/// Print search results to console
pub fn print_search_results(outcome: &SearchOutcome) {
    println!("\nQuery: {}\n", outcome.query);
    println!("Found {} results:\n", outcome.results.len());

    for (i, result) in outcome.results.iter().enumerate() {
        println!(
            "{}. [score: {:.3}] document {}",
            i + 1,
            result.score,
            result.doc_id
        );

        let preview: String = result.text.chars().take(200).collect();
        if result.text.chars().count() > 200 {
            println!("   {}...\n", preview.trim());
        } else {
            println!("   {}\n", preview.trim());
        }
    }
}
