//! Status command implementation

use anyhow::{Context, Result};
use tally::TallyDb;

pub fn execute(db: &TallyDb, key: Option<&str>) -> Result<()> {
    tracing::info!("Checking database status: {}", db.base_path().display());

    let meta = db.meta().context("Failed to read store metadata")?;

    println!("\nDatabase Status");
    println!("{}", "=".repeat(60));
    println!("Path: {}", db.base_path().display());
    println!("Schema Version: {}", meta.schema_version);
    println!("Created: {}", meta.created_at);
    println!("Updated: {}", meta.updated_at);

    if let Some(key) = key {
        println!("\nLeaderboard {:?}:", key);
        if !db.exists(key).context("Failed to read leaderboard")? {
            println!("  not initialized (or expired)");
            return Ok(());
        }
        println!("  Members: {}", db.len(key)?);
        match db.pttl(key)? {
            Some(ms) => println!("  Expires in: {} ms", ms),
            None => println!("  Expires: never"),
        }
    }

    Ok(())
}
