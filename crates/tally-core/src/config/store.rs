use crate::error::{Result, TallyError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the leaderboard state store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the store directory
    pub path: PathBuf,

    /// Maximum map size for LMDB (in bytes)
    /// Default: 1GB
    #[serde(default = "default_map_size")]
    pub map_size: usize,

    /// Sync mode for durability
    #[serde(default)]
    pub sync_mode: SyncMode,

    /// Number of stripes for lock manager
    /// Default: 256
    #[serde(default = "default_stripe_count")]
    pub stripe_count: usize,

    /// Maximum number of readers (LMDB specific)
    /// Default: 126
    #[serde(default = "default_max_readers")]
    pub max_readers: u32,

    /// Lock acquisition timeout in milliseconds (default: 5000)
    ///
    /// A unit that cannot lock its leaderboard within this timeout fails
    /// with `LockTimeout` instead of blocking indefinitely.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SyncMode {
    /// Full durability – calls `fsync()` on every commit.
    Full,

    /// Skips syncing the LMDB meta-page on each commit (default).
    ///
    /// Committed data survives process crashes. An OS crash may lose the last
    /// unit, but the store stays consistent.
    #[default]
    NoMetaSync,

    /// Disables `fsync()` entirely – the OS page cache decides when to flush.
    ///
    /// Only use this for ephemeral or test workloads.
    NoSync,
}

fn default_map_size() -> usize {
    1024 * 1024 * 1024 // 1GB
}

fn default_stripe_count() -> usize {
    256
}

fn default_max_readers() -> u32 {
    126
}

fn default_lock_timeout() -> u64 {
    5000
}

impl StoreConfig {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            map_size: default_map_size(),
            sync_mode: SyncMode::default(),
            stripe_count: default_stripe_count(),
            max_readers: default_max_readers(),
            lock_timeout_ms: default_lock_timeout(),
        }
    }

    /// Load a configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults; `path` is required.
    pub fn from_json_file(file: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(file)?;
        let cfg: StoreConfig = serde_json::from_str(&raw)
            .map_err(|e| TallyError::Config(format!("{}: {}", file.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check values that LMDB or the lock manager would reject later
    pub fn validate(&self) -> Result<()> {
        if self.stripe_count == 0 {
            return Err(TallyError::Config("stripe_count must be positive".into()));
        }
        if self.map_size == 0 {
            return Err(TallyError::Config("map_size must be positive".into()));
        }
        Ok(())
    }

    pub fn with_map_size(mut self, map_size: usize) -> Self {
        self.map_size = map_size;
        self
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn with_stripe_count(mut self, stripe_count: usize) -> Self {
        self.stripe_count = stripe_count;
        self
    }

    /// Set lock acquisition timeout in milliseconds
    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = StoreConfig::new(PathBuf::from("/tmp/tally"));
        assert_eq!(cfg.stripe_count, 256);
        assert_eq!(cfg.sync_mode, SyncMode::NoMetaSync);
        assert_eq!(cfg.lock_timeout_ms, 5000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_from_json_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tally.json");
        std::fs::write(&file, r#"{"path": "/var/lib/tally", "sync_mode": "NoSync"}"#).unwrap();

        let cfg = StoreConfig::from_json_file(&file).unwrap();
        assert_eq!(cfg.path, PathBuf::from("/var/lib/tally"));
        assert_eq!(cfg.sync_mode, SyncMode::NoSync);
        assert_eq!(cfg.max_readers, 126);
    }

    #[test]
    fn test_zero_stripes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("tally.json");
        std::fs::write(&file, r#"{"path": "/tmp/x", "stripe_count": 0}"#).unwrap();

        assert!(matches!(
            StoreConfig::from_json_file(&file),
            Err(TallyError::Config(_))
        ));
    }
}
