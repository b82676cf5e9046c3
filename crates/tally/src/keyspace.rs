//! Ordered-set, hash and expiry primitives over one store transaction
//!
//! A [`Keyspace`] is the body of a unit of work. Records are decoded once per
//! unit into a cache, mutated in place and written back on [`Keyspace::commit`].
//! Dropping or aborting the keyspace discards every change.
//!
//! Semantics follow the familiar sorted-set/hash command set, with two
//! differences:
//! - containers are created explicitly (`create_zset`, `create_hash`) and stay
//!   in place when their last member is removed, so "key exists" reflects
//!   initialization rather than content
//! - expiry is lazy: a record past its deadline reads as absent and is deleted
//!   at commit. The clock is sampled once, so a unit sees a single `now`.

use crate::values::{check_score, read_live, HashValue, KeyTtl, Record, SortedSet, Value};
use crate::{Result, TallyError};
use std::collections::hash_map::Entry as SlotEntry;
use std::collections::HashMap;
use tally_core::{CommitInfo, StateTxn};

struct Slot {
    record: Option<Record>,
    dirty: bool,
}

pub struct Keyspace<T: StateTxn> {
    txn: T,
    now_ms: i64,
    slots: HashMap<String, Slot>,
}

impl<T: StateTxn> Keyspace<T> {
    pub fn new(txn: T, now_ms: i64) -> Self {
        Self {
            txn,
            now_ms,
            slots: HashMap::new(),
        }
    }

    /// Clock value for this unit (epoch milliseconds)
    pub fn now_ms(&self) -> i64 {
        self.now_ms
    }

    fn slot(&mut self, key: &str) -> Result<&mut Slot> {
        match self.slots.entry(key.to_string()) {
            SlotEntry::Occupied(e) => Ok(e.into_mut()),
            SlotEntry::Vacant(e) => {
                let (record, expired) = read_live(&self.txn, key, self.now_ms)?;
                Ok(e.insert(Slot {
                    record,
                    dirty: expired,
                }))
            }
        }
    }

    fn zset(&mut self, key: &str) -> Result<Option<&SortedSet>> {
        match &self.slot(key)?.record {
            None => Ok(None),
            Some(Record {
                value: Value::SortedSet(set),
                ..
            }) => Ok(Some(set)),
            Some(_) => Err(TallyError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    fn hash(&mut self, key: &str) -> Result<Option<&HashValue>> {
        match &self.slot(key)?.record {
            None => Ok(None),
            Some(Record {
                value: Value::Hash(map),
                ..
            }) => Ok(Some(map)),
            Some(_) => Err(TallyError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    fn zset_mut(&mut self, key: &str) -> Result<&mut SortedSet> {
        let slot = self.slot(key)?;
        if slot.record.is_none() {
            slot.record = Some(Record::new(Value::SortedSet(SortedSet::new())));
        }
        match slot.record.as_mut() {
            Some(Record {
                value: Value::SortedSet(set),
                ..
            }) => {
                slot.dirty = true;
                Ok(set)
            }
            _ => Err(TallyError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    fn hash_mut(&mut self, key: &str) -> Result<&mut HashValue> {
        let slot = self.slot(key)?;
        if slot.record.is_none() {
            slot.record = Some(Record::new(Value::Hash(HashValue::new())));
        }
        match slot.record.as_mut() {
            Some(Record {
                value: Value::Hash(map),
                ..
            }) => {
                slot.dirty = true;
                Ok(map)
            }
            _ => Err(TallyError::WrongType {
                key: key.to_string(),
            }),
        }
    }

    // ---- key level ----

    pub fn exists(&mut self, key: &str) -> Result<bool> {
        Ok(self.slot(key)?.record.is_some())
    }

    /// Create an empty ordered set; false if the key already holds one
    pub fn create_zset(&mut self, key: &str) -> Result<bool> {
        if self.zset(key)?.is_some() {
            return Ok(false);
        }
        self.zset_mut(key)?;
        Ok(true)
    }

    /// Create an empty hash; false if the key already holds one
    pub fn create_hash(&mut self, key: &str) -> Result<bool> {
        if self.hash(key)?.is_some() {
            return Ok(false);
        }
        self.hash_mut(key)?;
        Ok(true)
    }

    /// Set an absolute deadline; false if the key does not exist
    pub fn pexpireat(&mut self, key: &str, at_ms: i64) -> Result<bool> {
        let now = self.now_ms;
        let slot = self.slot(key)?;
        let Some(record) = slot.record.as_mut() else {
            return Ok(false);
        };
        record.expires_at = Some(at_ms);
        if record.is_expired(now) {
            slot.record = None;
        }
        slot.dirty = true;
        Ok(true)
    }

    /// Set a deadline relative to this unit's clock
    pub fn pexpire(&mut self, key: &str, ttl_ms: i64) -> Result<bool> {
        let at = self.now_ms.saturating_add(ttl_ms);
        self.pexpireat(key, at)
    }

    /// Clear the deadline; true if one was set
    pub fn persist(&mut self, key: &str) -> Result<bool> {
        let slot = self.slot(key)?;
        match slot.record.as_mut() {
            Some(record) if record.expires_at.is_some() => {
                record.expires_at = None;
                slot.dirty = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn pttl(&mut self, key: &str) -> Result<KeyTtl> {
        let now = self.now_ms;
        Ok(match &self.slot(key)?.record {
            None => KeyTtl::Missing,
            Some(Record {
                expires_at: None, ..
            }) => KeyTtl::Persistent,
            Some(Record {
                expires_at: Some(at),
                ..
            }) => KeyTtl::Remaining(at - now),
        })
    }

    // ---- ordered set ----

    /// Add or overwrite members; returns how many were new
    pub fn zadd(&mut self, key: &str, members: &[(&str, f64)]) -> Result<usize> {
        if members.is_empty() {
            return Ok(0);
        }
        let checked = members
            .iter()
            .map(|(member, score)| Ok((*member, check_score(*score)?)))
            .collect::<Result<Vec<_>>>()?;

        let set = self.zset_mut(key)?;
        Ok(checked
            .into_iter()
            .filter(|(member, score)| set.insert(member, *score))
            .count())
    }

    /// Add `delta` to a member's score, creating it at `delta`
    pub fn zincrby(&mut self, key: &str, member: &str, delta: f64) -> Result<f64> {
        let delta = check_score(delta)?;
        let current = self.zscore(key, member)?.unwrap_or(0.0);
        let next = check_score(current + delta).map_err(|_| {
            TallyError::MalformedPayload(format!(
                "incrementing {:?} by {} is not a number",
                member, delta
            ))
        })?;
        self.zset_mut(key)?.insert(member, next);
        Ok(next)
    }

    pub fn zrem(&mut self, key: &str, members: &[&str]) -> Result<usize> {
        if members.is_empty() || self.zset(key)?.is_none() {
            return Ok(0);
        }
        let set = self.zset_mut(key)?;
        Ok(members.iter().filter(|m| set.remove(m)).count())
    }

    pub fn zcard(&mut self, key: &str) -> Result<usize> {
        Ok(self.zset(key)?.map_or(0, SortedSet::len))
    }

    pub fn zscore(&mut self, key: &str, member: &str) -> Result<Option<f64>> {
        Ok(self.zset(key)?.and_then(|set| set.score(member)))
    }

    /// Rank counting from the highest score
    pub fn zrevrank(&mut self, key: &str, member: &str) -> Result<Option<usize>> {
        Ok(self.zset(key)?.and_then(|set| set.rev_rank(member)))
    }

    /// Ascending rank range, inclusive, with scores
    pub fn zrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<(String, f64)>> {
        Ok(self
            .zset(key)?
            .map(|set| set.range(start, stop, false))
            .unwrap_or_default())
    }

    /// Descending rank range, inclusive, with scores
    pub fn zrevrange(&mut self, key: &str, start: i64, stop: i64) -> Result<Vec<(String, f64)>> {
        Ok(self
            .zset(key)?
            .map(|set| set.range(start, stop, true))
            .unwrap_or_default())
    }

    /// Remove and return the `count` lowest-scoring members
    pub fn zpopmin(&mut self, key: &str, count: usize) -> Result<Vec<(String, f64)>> {
        if count == 0 || self.zset(key)?.is_none() {
            return Ok(Vec::new());
        }
        Ok(self.zset_mut(key)?.pop_min(count))
    }

    /// Replace `dest` with the union of `sources`, summing shared scores
    ///
    /// The result is stored even when empty and carries no deadline. Returns
    /// the size of the stored set.
    pub fn zunionstore(&mut self, dest: &str, sources: &[&str]) -> Result<usize> {
        let mut union = SortedSet::new();
        for source in sources {
            let Some(set) = self.zset(source)? else {
                continue;
            };
            let pairs: Vec<(String, f64)> =
                set.iter().map(|(m, s)| (m.to_string(), s)).collect();
            for (member, score) in pairs {
                let total = check_score(union.score(&member).unwrap_or(0.0) + score)?;
                union.insert(&member, total);
            }
        }

        let len = union.len();
        let slot = self.slot(dest)?;
        slot.record = Some(Record::new(Value::SortedSet(union)));
        slot.dirty = true;
        Ok(len)
    }

    // ---- hash ----

    /// Overwrite fields; returns how many were new
    pub fn hset(&mut self, key: &str, fields: &[(&str, &[u8])]) -> Result<usize> {
        if fields.is_empty() {
            return Ok(0);
        }
        let map = self.hash_mut(key)?;
        Ok(fields
            .iter()
            .filter(|(field, value)| map.insert(field.to_string(), value.to_vec()).is_none())
            .count())
    }

    pub fn hget(&mut self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.hash(key)?.and_then(|map| map.get(field).cloned()))
    }

    /// Values for each field, aligned with `fields`
    pub fn hmget(&mut self, key: &str, fields: &[&str]) -> Result<Vec<Option<Vec<u8>>>> {
        let map = self.hash(key)?;
        Ok(fields
            .iter()
            .map(|field| map.and_then(|m| m.get(*field).cloned()))
            .collect())
    }

    pub fn hdel(&mut self, key: &str, fields: &[&str]) -> Result<usize> {
        if fields.is_empty() || self.hash(key)?.is_none() {
            return Ok(0);
        }
        let map = self.hash_mut(key)?;
        Ok(fields.iter().filter(|f| map.remove(**f).is_some()).count())
    }

    pub fn hgetall(&mut self, key: &str) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .hash(key)?
            .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    // ---- lifecycle ----

    /// Write back every touched record and commit the transaction
    pub fn commit(mut self) -> Result<CommitInfo> {
        for (key, slot) in self.slots.drain() {
            if !slot.dirty {
                continue;
            }
            match slot.record {
                Some(record) => self.txn.put_state(key.as_bytes(), &record.to_bytes()?)?,
                None => self.txn.del_state(key.as_bytes())?,
            }
        }
        self.txn.commit()
    }

    /// Discard every change made through this keyspace
    pub fn abort(self) {
        self.txn.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::{StateStore, StoreConfig, SyncMode};
    use tally_lmdb::LmdbStateStore;

    fn open_store() -> (LmdbStateStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let cfg = StoreConfig::new(dir.path().to_path_buf())
            .with_map_size(16 * 1024 * 1024)
            .with_sync_mode(SyncMode::NoSync);
        (LmdbStateStore::open(cfg).unwrap(), dir)
    }

    #[test]
    fn test_zadd_counts_new_members_only() {
        let (store, _dir) = open_store();
        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);

        assert_eq!(ks.zadd("b:z", &[("a", 1.0), ("b", 2.0)]).unwrap(), 2);
        assert_eq!(ks.zadd("b:z", &[("a", 5.0), ("c", 3.0)]).unwrap(), 1);
        assert_eq!(ks.zscore("b:z", "a").unwrap(), Some(5.0));
        assert_eq!(ks.zrevrank("b:z", "a").unwrap(), Some(0));
        assert_eq!(ks.zcard("b:z").unwrap(), 3);
    }

    #[test]
    fn test_nan_score_rejected_without_partial_write() {
        let (store, _dir) = open_store();
        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);

        let err = ks.zadd("b:z", &[("a", 1.0), ("b", f64::NAN)]).unwrap_err();
        assert!(matches!(err, TallyError::MalformedPayload(_)));
        assert!(!ks.exists("b:z").unwrap());
    }

    #[test]
    fn test_wrong_type() {
        let (store, _dir) = open_store();
        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);

        ks.hset("b:h", &[("a", b"x".as_slice())]).unwrap();
        assert!(matches!(
            ks.zadd("b:h", &[("a", 1.0)]),
            Err(TallyError::WrongType { .. })
        ));
    }

    #[test]
    fn test_emptied_container_still_exists() {
        let (store, _dir) = open_store();
        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);

        ks.zadd("b:z", &[("a", 1.0)]).unwrap();
        assert_eq!(ks.zrem("b:z", &["a", "missing"]).unwrap(), 1);
        assert!(ks.exists("b:z").unwrap());
        assert_eq!(ks.zcard("b:z").unwrap(), 0);
        assert_eq!(ks.zrem("other:z", &["a"]).unwrap(), 0);
        assert!(!ks.exists("other:z").unwrap());
    }

    #[test]
    fn test_commit_and_reload() {
        let (store, _dir) = open_store();

        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);
        ks.zadd("b:z", &[("a", 1.0), ("b", 2.0)]).unwrap();
        ks.hset("b:h", &[("a", b"info".as_slice())]).unwrap();
        let info = ks.commit().unwrap();
        assert_eq!(info.state_keys_written, 2);

        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);
        assert_eq!(ks.zrevrange("b:z", 0, -1).unwrap()[0].0, "b");
        assert_eq!(ks.hget("b:h", "a").unwrap(), Some(b"info".to_vec()));
        assert_eq!(ks.hmget("b:h", &["a", "b"]).unwrap(), vec![Some(b"info".to_vec()), None]);
    }

    #[test]
    fn test_abort_discards() {
        let (store, _dir) = open_store();

        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);
        ks.zadd("b:z", &[("a", 1.0)]).unwrap();
        ks.abort();

        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);
        assert!(!ks.exists("b:z").unwrap());
    }

    #[test]
    fn test_expiry_is_lazy_and_per_unit_clock() {
        let (store, _dir) = open_store();

        let mut ks = Keyspace::new(store.write_txn().unwrap(), 1_000);
        ks.zadd("b:z", &[("a", 1.0)]).unwrap();
        assert!(ks.pexpire("b:z", 500).unwrap());
        assert_eq!(ks.pttl("b:z").unwrap(), KeyTtl::Remaining(500));
        ks.commit().unwrap();

        let mut ks = Keyspace::new(store.write_txn().unwrap(), 1_499);
        assert!(ks.exists("b:z").unwrap());
        ks.abort();

        let mut ks = Keyspace::new(store.write_txn().unwrap(), 1_500);
        assert!(!ks.exists("b:z").unwrap());
        assert_eq!(ks.pttl("b:z").unwrap(), KeyTtl::Missing);
        let info = ks.commit().unwrap();
        assert_eq!(info.state_keys_deleted, 1);
    }

    #[test]
    fn test_pexpireat_in_past_drops_key() {
        let (store, _dir) = open_store();
        let mut ks = Keyspace::new(store.write_txn().unwrap(), 10_000);

        ks.create_hash("b:h").unwrap();
        assert!(ks.pexpireat("b:h", 5_000).unwrap());
        assert!(!ks.exists("b:h").unwrap());
        assert!(!ks.pexpireat("b:h", 20_000).unwrap());
    }

    #[test]
    fn test_persist() {
        let (store, _dir) = open_store();
        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);

        ks.create_zset("b:z").unwrap();
        assert!(!ks.persist("b:z").unwrap());
        ks.pexpire("b:z", 100).unwrap();
        assert!(ks.persist("b:z").unwrap());
        assert_eq!(ks.pttl("b:z").unwrap(), KeyTtl::Persistent);
    }

    #[test]
    fn test_zunionstore_replaces_destination() {
        let (store, _dir) = open_store();
        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);

        ks.zadd("src:z", &[("a", 1.0), ("b", 2.0)]).unwrap();
        ks.zadd("dst:z", &[("stale", 9.0)]).unwrap();
        ks.pexpire("dst:z", 1_000).unwrap();

        assert_eq!(ks.zunionstore("dst:z", &["src:z", "missing:z"]).unwrap(), 2);
        assert_eq!(ks.zscore("dst:z", "stale").unwrap(), None);
        assert_eq!(ks.zscore("dst:z", "b").unwrap(), Some(2.0));
        assert_eq!(ks.pttl("dst:z").unwrap(), KeyTtl::Persistent);
    }

    #[test]
    fn test_zpopmin_and_hdel() {
        let (store, _dir) = open_store();
        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);

        ks.zadd("b:z", &[("a", 1.0), ("b", 2.0), ("c", 3.0)]).unwrap();
        ks.hset("b:h", &[("a", b"1".as_slice()), ("c", b"3".as_slice())])
            .unwrap();

        let popped = ks.zpopmin("b:z", 2).unwrap();
        assert_eq!(popped.len(), 2);
        let ids: Vec<&str> = popped.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(ks.hdel("b:h", &ids).unwrap(), 1);
        assert_eq!(ks.hgetall("b:h").unwrap(), vec![("c".to_string(), b"3".to_vec())]);
    }

    #[test]
    fn test_zincrby() {
        let (store, _dir) = open_store();
        let mut ks = Keyspace::new(store.write_txn().unwrap(), 0);

        assert_eq!(ks.zincrby("b:z", "a", 2.5).unwrap(), 2.5);
        assert_eq!(ks.zincrby("b:z", "a", -1.0).unwrap(), 1.5);
        assert!(ks.zincrby("b:z", "a", f64::NAN).is_err());
        assert!(ks.zincrby("b:z", "b", f64::INFINITY).is_ok());
        assert!(ks.zincrby("b:z", "b", f64::NEG_INFINITY).is_err());
    }
}
