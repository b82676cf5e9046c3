pub mod leaderboard;
pub mod status;

use anyhow::{Context, Result};
use std::path::PathBuf;
use tally::{StoreConfig, TallyDb};

/// Open the database from `--config`, with `--db-path` taking precedence
pub fn open_db(db_path: Option<PathBuf>, config: Option<PathBuf>) -> Result<TallyDb> {
    let mut store_config = match config {
        Some(file) => StoreConfig::from_json_file(&file)
            .with_context(|| format!("Failed to load config {}", file.display()))?,
        None => StoreConfig::new(PathBuf::from("./data")),
    };
    if let Some(path) = db_path {
        store_config.path = path;
    }

    tracing::debug!(path = %store_config.path.display(), "Opening database");
    TallyDb::open_with_config(store_config).context("Failed to open database")
}
