//! Tally: atomic ranked leaderboards over an embedded store
//!
//! A leaderboard is a pair of records under one logical key `K`:
//! - `K:z`: ordered set of member ids by score (ranks count from the top)
//! - `K:h`: info map from member id to opaque bytes
//!
//! Every operation runs as one unit on LMDB. Policy ([`Options`]: clone
//! source, capacity and expiry) is re-applied on each call.
//!
//! # Quick Start
//!
//! ```no_run
//! use tally::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let db = TallyDb::open("./data")?;
//! let options = Options::new().with_capacity(100).with_idle_expire(60_000);
//!
//! db.set_score(
//!     "weekly",
//!     Some(&options),
//!     &[EntryInput::new("alice", 42.0).with_info("Alice")],
//! )?;
//! db.inc_score("weekly", Some(&options), &[EntryInput::new("bob", 7.0)])?;
//!
//! for entry in db.get_range("weekly", Some(&options), 0, 9)? {
//!     println!("#{} {} {}", entry.rank, entry.id, entry.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod db;
pub mod entry;
pub mod keyspace;
pub mod ops;
pub mod options;
pub mod policy;
pub mod prelude;
pub mod transaction;
pub mod values;

// Re-export core types
pub use tally_core::{
    config::{StoreConfig, SyncMode},
    error::{Result, TallyError},
    traits::{StateRead, StateStore, StateTxn},
    types::{CommitInfo, StoreMeta},
    LockManager,
};

// Re-export implementations
pub use tally_lmdb::LmdbStateStore;

// Re-export main types from this crate
pub use command::{Command, Reply};
pub use db::TallyDb;
pub use entry::{Entry, EntryInput};
pub use keyspace::Keyspace;
pub use options::{Expiry, Options};
pub use policy::{LeaderboardKeys, PolicyOutcome};
pub use transaction::Unit;
pub use values::KeyTtl;
