//! Unit of work over one or more leaderboards
//!
//! A unit runs in three phases:
//! 1. **Lock**: acquire stripe locks on every logical key it touches,
//!    including a `construct_from` source, in stripe order with a timeout
//! 2. **Body**: open one LMDB write transaction and run the closure against a
//!    fresh [`Keyspace`] whose clock is sampled once
//! 3. **Commit**: flush the keyspace and commit, or abort on any error
//!
//! Locks are released when the unit returns.
//!
//! # Example
//!
//! ```no_run
//! use tally::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let db = TallyDb::open("./data")?;
//!
//! let members = Unit::new(&db, "custom")
//!     .lock("weekly")
//!     .execute(|ks| {
//!         ks.zadd("weekly:z", &[("alice", 10.0)])?;
//!         ks.zcard("weekly:z")
//!     })?;
//! # Ok(())
//! # }
//! ```

use crate::keyspace::Keyspace;
use crate::{Result, TallyDb};
use std::time::Instant;
use tally_core::{observe, StateStore};
use tally_lmdb::LmdbWriteTxn;

/// Builder for one atomic unit
pub struct Unit<'a> {
    db: &'a TallyDb,
    op: &'static str,
    keys: Vec<String>,
}

impl<'a> Unit<'a> {
    /// `op` labels logs and metrics
    pub fn new(db: &'a TallyDb, op: &'static str) -> Self {
        Self {
            db,
            op,
            keys: Vec::new(),
        }
    }

    /// Declare a logical key this unit reads or writes
    pub fn lock(mut self, key: impl Into<String>) -> Self {
        self.keys.push(key.into());
        self
    }

    /// Run `f` atomically and return its result
    ///
    /// If `f` fails, nothing it wrote is kept.
    pub fn execute<R, F>(self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Keyspace<LmdbWriteTxn<'_>>) -> Result<R>,
    {
        let started = Instant::now();
        let store = self.db.store();

        let _locks = store.lock_manager().acquire_keys(&self.keys)?;

        let mut ks = Keyspace::new(store.write_txn()?, self.db.now_ms());
        let outcome = match f(&mut ks) {
            Ok(value) => ks.commit().map(|info| (value, info)),
            Err(e) => {
                ks.abort();
                Err(e)
            }
        };

        observe::record_unit(self.op, started.elapsed(), outcome.is_ok());
        match &outcome {
            Ok((_, info)) => tracing::debug!(
                op = self.op,
                keys = ?self.keys,
                written = info.state_keys_written,
                deleted = info.state_keys_deleted,
                "Unit committed"
            ),
            Err(e) => tracing::debug!(
                op = self.op,
                keys = ?self.keys,
                error = %e,
                "Unit aborted"
            ),
        }

        outcome.map(|(value, _)| value)
    }
}
