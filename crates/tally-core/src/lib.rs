//! Tally Core: traits and types for the tally leaderboard store
//!
//! This crate defines the abstractions shared by the storage backend and the
//! leaderboard engine:
//! - Byte-level state store: transactional KV where one write transaction is
//!   one atomic unit of work
//! - Stripe locking: units touching different leaderboards lock different stripes
//! - Error taxonomy distinguishing malformed input, missing ranks and policy
//!   violations
//! - Store configuration with serde defaults

pub mod config;
pub mod error;
pub mod lock_manager;
pub mod observe;
pub mod traits;
pub mod types;

pub use config::{StoreConfig, SyncMode};
pub use error::{Result, TallyError};
pub use lock_manager::{LockManager, MultiLockGuard};
pub use traits::{StateRead, StateStore, StateTxn};
pub use types::{CommitInfo, StoreMeta};
