//! Operation bodies
//!
//! Each function runs inside one unit, after the policy preamble, against the
//! physical pair named by [`LeaderboardKeys`](crate::policy::LeaderboardKeys).
//! - [`board`]: score assignment, removal, info and ranked reads
//! - [`vector`]: append-ordered lists and position swaps
//!
//! Vector mode encodes insertion order in the score, so a key should be used
//! either as a scored leaderboard or as a vector, never both.

pub mod board;
pub mod vector;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::keyspace::Keyspace;
    use tally_core::{StateStore, StoreConfig, SyncMode};
    use tally_lmdb::{LmdbStateStore, LmdbWriteTxn};

    pub fn open_store() -> (LmdbStateStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig::new(dir.path().to_path_buf())
            .with_map_size(16 * 1024 * 1024)
            .with_sync_mode(SyncMode::NoSync);
        (LmdbStateStore::open(cfg).unwrap(), dir)
    }

    pub fn keyspace(store: &LmdbStateStore) -> Keyspace<LmdbWriteTxn<'_>> {
        Keyspace::new(store.write_txn().unwrap(), 0)
    }
}
