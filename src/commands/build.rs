//! Build command implementation

use crate::config::Config;
use crate::embed::Embedder;
use crate::error::Result;
use crate::index::{build_index, BuildStats, IndexOptions};
use crate::meta::{BuildRun, MetaDb, RunStatus};
use crate::registry::DocumentSource;
use crate::store::VectorIndex;
use tracing::info;

/// Rebuild the vector index, recording the run in the database
pub async fn cmd_build(
    config: &Config,
    db: &MetaDb,
    source: &dyn DocumentSource,
    embedder: &dyn Embedder,
    index: &dyn VectorIndex,
    options: IndexOptions,
) -> Result<BuildStats> {
    info!(
        "Starting build (limit: {:?}, force_reindex: {})",
        options.limit, options.force_reindex
    );

    let run = BuildRun::new();
    db.insert_build_run(&run).await?;

    match build_index(source, embedder, index, config, &options).await {
        Ok(stats) => {
            let errors_json = if stats.errors.is_empty() {
                None
            } else {
                Some(serde_json::to_string(&stats.errors)?)
            };
            db.finish_build_run(
                &run.id,
                RunStatus::Completed,
                stats.docs_processed as i64,
                stats.points_written as i64,
                errors_json,
            )
            .await?;
            Ok(stats)
        }
        Err(e) => {
            db.finish_build_run(
                &run.id,
                RunStatus::Failed,
                0,
                0,
                Some(serde_json::to_string(&[e.to_string()])?),
            )
            .await?;
            Err(e)
        }
    }
}

/// Print build stats to console
pub fn print_build_stats(stats: &BuildStats) {
    println!("Build complete");
    println!("  Documents processed: {}", stats.docs_processed);
    println!("  Documents skipped:   {}", stats.docs_skipped);
    println!("  Documents failed:    {}", stats.docs_failed);
    println!("  Points written:      {}", stats.points_written);

    if !stats.errors.is_empty() {
        println!("  Warnings:");
        for error in &stats.errors {
            println!("    - {}", error);
        }
    }
}
