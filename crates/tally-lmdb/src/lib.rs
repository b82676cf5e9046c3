//! LMDB-backed state store
//!
//! Provides the transactional byte-level KV that tally leaderboards are
//! encoded into.
//!
//! Key features:
//! - One LMDB write transaction per unit of work; LMDB admits a single writer,
//!   so units are serialized and a dropped transaction leaves no trace
//! - Read-only snapshots for inspection that never block the writer
//! - Store metadata (schema version, timestamps) kept beside the state

pub mod keys;
pub mod store;
pub mod txn;

pub use store::LmdbStateStore;
pub use txn::{LmdbReadTxn, LmdbWriteTxn};
