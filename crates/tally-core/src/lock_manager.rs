//! Stripe locks over logical leaderboard keys
//!
//! Each unit of work locks the leaderboards it reads or writes before the
//! store transaction begins. Keys hash to stripes and stripes are always taken
//! in ascending index order, so two units locking `[a, b]` and `[b, a]` cannot
//! deadlock.

use crate::error::{Result, TallyError};
use crate::observe;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use xxhash_rust::xxh3::xxh3_64;

/// Default lock acquisition timeout (5 seconds)
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

pub struct LockManager {
    stripes: Vec<Mutex<()>>,
    timeout: Duration,
}

/// Stripe guards held for the lifetime of one unit
///
/// Guards are stored in ascending stripe order and released on drop.
pub struct MultiLockGuard<'a> {
    _guards: Vec<MutexGuard<'a, ()>>,
}

impl MultiLockGuard<'_> {
    /// Number of distinct stripes held
    pub fn stripes_held(&self) -> usize {
        self._guards.len()
    }
}

impl LockManager {
    /// Create a lock manager with `num_stripes` stripes
    ///
    /// # Panics
    ///
    /// Panics if `num_stripes` is 0.
    pub fn new(num_stripes: usize, timeout: Duration) -> Self {
        assert!(num_stripes > 0, "num_stripes must be positive");
        Self {
            stripes: (0..num_stripes).map(|_| Mutex::new(())).collect(),
            timeout,
        }
    }

    pub fn with_stripes(num_stripes: usize) -> Self {
        Self::new(num_stripes, Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS))
    }

    fn stripe_index(&self, key: &[u8]) -> usize {
        (xxh3_64(key) as usize) % self.stripes.len()
    }

    /// Lock every stripe the given keys hash to
    ///
    /// Duplicate keys, and distinct keys sharing a stripe, lock once.
    pub fn acquire_keys<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<MultiLockGuard<'_>> {
        let started = Instant::now();
        let indices: BTreeSet<usize> = keys.iter().map(|k| self.stripe_index(k.as_ref())).collect();

        let mut guards = Vec::with_capacity(indices.len());
        for idx in indices {
            match self.stripes[idx].try_lock_for(self.timeout) {
                Some(guard) => guards.push(guard),
                None => {
                    return Err(TallyError::LockTimeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    })
                }
            }
        }

        observe::record_lock_wait(started.elapsed());
        Ok(MultiLockGuard { _guards: guards })
    }

    pub fn num_stripes(&self) -> usize {
        self.stripes.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
