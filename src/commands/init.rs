//! Init command implementation

use crate::config::{default_data_dir, Config};
use crate::error::{Error, Result};
use crate::meta::MetaDb;
use std::path::Path;
use tracing::info;

/// Initialize configuration and database, returning the fresh config
pub async fn cmd_init(config_path: Option<&Path>, force: bool) -> Result<Config> {
    let data_dir = match config_path {
        Some(p) => p
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| p.to_path_buf()),
        None => default_data_dir()?,
    };

    let mut config = Config::with_data_dir(data_dir);
    if let Some(p) = config_path {
        config.paths.config_file = p.to_path_buf();
    }

    if config.paths.config_file.exists() && !force {
        return Err(Error::AlreadyInitialized(
            config.paths.config_file.display().to_string(),
        ));
    }

    config.save()?;
    info!("Wrote config to {:?}", config.paths.config_file);

    let db = MetaDb::connect(&config.paths.db_file).await?;
    db.init_schema().await?;

    Ok(config)
}

/// Print init outcome to console
pub fn print_init(config: &Config) {
    println!("Initialized docchat");
    println!("  Config:   {}", config.paths.config_file.display());
    println!("  Database: {}", config.paths.db_file.display());
    println!("  Qdrant:   {}", config.qdrant_url);
    println!();
    println!("Next: run 'docchat build' to index registered documents.");
}
