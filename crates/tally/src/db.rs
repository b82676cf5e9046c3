//! Leaderboard database facade
//!
//! Every operation takes a logical key and an optional [`Options`] bundle and
//! runs as one unit: policy preamble, body, then for writing bodies a second
//! pass of init, capacity trim and expiry so both keys leave the unit in one
//! shared state.

use crate::entry::{Entry, EntryInput};
use crate::keyspace::Keyspace;
use crate::ops::{board, vector};
use crate::options::Options;
use crate::policy::{self, LeaderboardKeys};
use crate::transaction::Unit;
use crate::values::{read_live, Record, Value};
use crate::{Result, StoreConfig, TallyError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tally_core::{StateStore, StoreMeta};
use tally_lmdb::{LmdbStateStore, LmdbWriteTxn};

type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Handle to an embedded leaderboard store
///
/// Cheap to share behind an `Arc`; units from many threads are serialized by
/// the store's single writer.
pub struct TallyDb {
    store: Arc<LmdbStateStore>,
    base_path: PathBuf,
    clock: Clock,
}

impl TallyDb {
    /// Open (or create) a database in `path` with default settings
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(StoreConfig::new(path.as_ref().to_path_buf()))
    }

    pub fn open_with_config(config: StoreConfig) -> Result<Self> {
        let base_path = config.path.clone();
        let store = Arc::new(LmdbStateStore::open(config)?);
        Ok(Self {
            store,
            base_path,
            clock: Arc::new(|| chrono::Utc::now().timestamp_millis()),
        })
    }

    /// Replace the wall clock used for expiry (epoch milliseconds)
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn store(&self) -> &Arc<LmdbStateStore> {
        &self.store
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn now_ms(&self) -> i64 {
        (self.clock)()
    }

    /// Start a custom unit
    pub fn unit(&self, op: &'static str) -> Unit<'_> {
        Unit::new(self, op)
    }

    fn run<R, F>(
        &self,
        op: &'static str,
        key: &str,
        options: Option<&Options>,
        writes: bool,
        body: F,
    ) -> Result<R>
    where
        F: FnOnce(&mut Keyspace<LmdbWriteTxn<'_>>, &LeaderboardKeys) -> Result<R>,
    {
        let mut unit = self.unit(op).lock(key);
        if let Some(source) = options.and_then(|o| o.construct_from.as_deref()) {
            unit = unit.lock(source);
        }

        unit.execute(|ks| {
            policy::apply(ks, key, options)?;
            let keys = LeaderboardKeys::new(key);
            let value = body(ks, &keys)?;
            if writes {
                policy::settle(ks, &keys, options)?;
            }
            Ok(value)
        })
    }

    // ---- policy ----

    /// Apply policy only
    ///
    /// With `None` this just makes sure both keys exist.
    pub fn touch(&self, key: &str, options: Option<&Options>) -> Result<()> {
        self.run("touch", key, options, false, |_, _| Ok(()))
    }

    // ---- entries ----

    pub fn remove_id(&self, key: &str, options: Option<&Options>, ids: &[&str]) -> Result<usize> {
        self.run("remove_id", key, options, true, |ks, keys| {
            board::remove_id(ks, keys, ids)
        })
    }

    pub fn set_score(
        &self,
        key: &str,
        options: Option<&Options>,
        entries: &[EntryInput],
    ) -> Result<usize> {
        self.run("set_score", key, options, true, |ks, keys| {
            board::set_score(ks, keys, entries)
        })
    }

    pub fn inc_score(
        &self,
        key: &str,
        options: Option<&Options>,
        entries: &[EntryInput],
    ) -> Result<Vec<f64>> {
        self.run("inc_score", key, options, true, |ks, keys| {
            board::inc_score(ks, keys, entries)
        })
    }

    pub fn set_info(
        &self,
        key: &str,
        options: Option<&Options>,
        entries: &[EntryInput],
    ) -> Result<usize> {
        self.run("set_info", key, options, true, |ks, keys| {
            board::set_info(ks, keys, entries)
        })
    }

    pub fn get_range(
        &self,
        key: &str,
        options: Option<&Options>,
        start: i64,
        stop: i64,
    ) -> Result<Vec<Entry>> {
        self.run("get_range", key, options, false, |ks, keys| {
            board::get_range(ks, keys, start, stop)
        })
    }

    pub fn get_by_id(&self, key: &str, options: Option<&Options>, id: &str) -> Result<Option<Entry>> {
        self.run("get_by_id", key, options, false, |ks, keys| {
            board::get_by_id(ks, keys, id)
        })
    }

    // ---- vector ----

    pub fn append(&self, key: &str, options: Option<&Options>, entries: &[EntryInput]) -> Result<usize> {
        self.run("append", key, options, true, |ks, keys| {
            vector::append(ks, keys, entries)
        })
    }

    pub fn swap_by_id(
        &self,
        key: &str,
        options: Option<&Options>,
        id_a: &str,
        id_b: &str,
    ) -> Result<usize> {
        self.run("swap_by_id", key, options, true, |ks, keys| {
            vector::swap_by_id(ks, keys, id_a, id_b)
        })
    }

    pub fn swap_by_rank(
        &self,
        key: &str,
        options: Option<&Options>,
        rank_a: i64,
        rank_b: i64,
    ) -> Result<usize> {
        self.run("swap_by_rank", key, options, true, |ks, keys| {
            vector::swap_by_rank(ks, keys, rank_a, rank_b)
        })
    }

    // ---- inspection (read-only, no policy) ----

    fn read_record(&self, physical_key: &str) -> Result<Option<Record>> {
        let txn = self.store.read_txn()?;
        let (record, _) = read_live(&txn, physical_key, self.now_ms())?;
        Ok(record)
    }

    /// True when both keys of the leaderboard are live
    pub fn exists(&self, key: &str) -> Result<bool> {
        let keys = LeaderboardKeys::new(key);
        Ok(self.read_record(&keys.zset)?.is_some() && self.read_record(&keys.info)?.is_some())
    }

    /// Number of ranked members
    pub fn len(&self, key: &str) -> Result<usize> {
        let keys = LeaderboardKeys::new(key);
        match self.read_record(&keys.zset)? {
            None => Ok(0),
            Some(Record {
                value: Value::SortedSet(set),
                ..
            }) => Ok(set.len()),
            Some(_) => Err(TallyError::WrongType { key: keys.zset }),
        }
    }

    /// Milliseconds until the leaderboard expires
    ///
    /// `None` when it is persistent or absent.
    pub fn pttl(&self, key: &str) -> Result<Option<i64>> {
        let keys = LeaderboardKeys::new(key);
        let now = self.now_ms();
        Ok(self
            .read_record(&keys.zset)?
            .and_then(|record| record.expires_at)
            .map(|at| at - now))
    }

    pub fn meta(&self) -> Result<StoreMeta> {
        self.store.meta()
    }

    /// Close the database
    pub fn close(self) -> Result<()> {
        self.store.close()
    }
}
