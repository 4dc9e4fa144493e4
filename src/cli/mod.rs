pub mod commands;
pub mod enqueue;
pub mod query;
pub mod render;
pub mod scan;
pub mod worker;

use std::path::Path;

pub use commands::{Cli, Commands, LogFormat};

use crate::config::{parse_config, ReconConfig};
use crate::db::Database;
use crate::errors::ReconError;
use commands::StoreArgs;

/// Config from `--config`, or the defaults when none is given.
pub async fn load_config(store: &StoreArgs) -> Result<ReconConfig, ReconError> {
    match &store.config {
        Some(path) => parse_config(Path::new(path)).await,
        None => Ok(ReconConfig::default()),
    }
}

/// Open the database named by `--db`, falling back to `database.path`.
pub fn open_database(store: &StoreArgs, config: &ReconConfig) -> Result<Database, ReconError> {
    Database::new(store.db.as_deref().unwrap_or(&config.database.path))
}

pub async fn handle_validate(args: commands::ValidateArgs) -> Result<(), ReconError> {
    let config = parse_config(Path::new(&args.config)).await?;
    println!("Configuration is valid: {}", args.config);
    println!(
        "  breach mode: {:?}, workers: {}, cache: {}",
        config.breach.mode,
        config.worker.concurrency,
        if config.cache.enabled { "on" } else { "off" }
    );
    Ok(())
}
