//! Tally prelude
//!
//! ```
//! use tally::prelude::*;
//! ```

pub use crate::{
    Command, CommitInfo, Entry, EntryInput, Expiry, Keyspace, LeaderboardKeys, Options, Reply,
    Result, StoreConfig, StoreMeta, SyncMode, TallyDb, TallyError, Unit,
};

pub use crate::{LmdbStateStore, StateStore, StateTxn};

pub use anyhow;
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
pub use tracing;
