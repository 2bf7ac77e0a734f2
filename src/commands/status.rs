//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::meta::{BuildRun, MetaDb};
use crate::store::VectorIndex;
use serde::Serialize;

/// System status for CLI display
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub collection: String,
    pub points: u64,
    pub memory_records: i64,
    pub latest_build: Option<BuildRun>,
}

/// Gather index and database status
pub async fn cmd_status(config: &Config, db: &MetaDb, index: &dyn VectorIndex) -> Result<Status> {
    let points = index.count().await?;
    let memory_records = db.count_memory_records().await?;
    let latest_build = db.latest_build_run().await?;

    Ok(Status {
        collection: config.collection_name.clone(),
        points,
        memory_records,
        latest_build,
    })
}

/// Print status to console
pub fn print_status(status: &Status) {
    println!("docchat status");
    println!("  Collection:     {}", status.collection);
    println!("  Indexed points: {}", status.points);
    println!("  Memory records: {}", status.memory_records);

    match &status.latest_build {
        Some(run) => {
            println!(
                "  Latest build:   {} ({} docs, {} points, started {})",
                run.status, run.docs_processed, run.points_written, run.started_at
            );
        }
        None => println!("  Latest build:   never"),
    }
}
