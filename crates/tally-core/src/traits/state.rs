use crate::config::StoreConfig;
use crate::error::Result;
use crate::lock_manager::LockManager;
use crate::types::{CommitInfo, StoreMeta};

/// Point reads against a consistent snapshot of state
pub trait StateRead {
    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Write transaction: the store's atomic unit
///
/// Everything written through one transaction becomes visible together on
/// `commit`, or not at all. Dropping a transaction without committing aborts it.
///
/// Note: Not required to be Send, as some backends (LMDB) have thread-affine transactions
pub trait StateTxn: StateRead {
    fn put_state(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Delete a key (idempotent)
    fn del_state(&mut self, key: &[u8]) -> Result<()>;

    fn commit(self) -> Result<CommitInfo>;

    fn abort(self);
}

/// Transactional byte-level KV store backing the leaderboards
pub trait StateStore: Send + Sync {
    type Txn<'a>: StateTxn
    where
        Self: 'a;

    type ReadTxn<'a>: StateRead
    where
        Self: 'a;

    fn open(cfg: StoreConfig) -> Result<Self>
    where
        Self: Sized;

    fn close(&self) -> Result<()>;

    /// Begin a write transaction
    ///
    /// Write transactions are serialized: at most one is open at a time.
    fn write_txn(&self) -> Result<Self::Txn<'_>>;

    /// Begin a read-only transaction
    fn read_txn(&self) -> Result<Self::ReadTxn<'_>>;

    fn lock_manager(&self) -> &LockManager;

    fn meta(&self) -> Result<StoreMeta>;
}
