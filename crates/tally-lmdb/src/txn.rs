use lmdb::{Database, RoTransaction, RwTransaction, Transaction, WriteFlags};
use tally_core::{
    error::{Result, TallyError},
    traits::{StateRead, StateTxn},
    types::CommitInfo,
};

use crate::keys::meta_keys;
use crate::store::txn_err;

/// Write transaction for the LMDB state store
pub struct LmdbWriteTxn<'a> {
    txn: Option<RwTransaction<'a>>,
    state_db: Database,
    meta_db: Database,
    stats: CommitInfo,
}

/// Read-only transaction for the LMDB state store
///
/// Sees the last committed unit and never blocks the writer.
pub struct LmdbReadTxn<'a> {
    txn: RoTransaction<'a>,
    state_db: Database,
}

impl<'a> LmdbReadTxn<'a> {
    pub fn new(txn: RoTransaction<'a>, state_db: Database) -> Self {
        Self { txn, state_db }
    }
}

impl StateRead for LmdbReadTxn<'_> {
    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.txn.get(self.state_db, &key) {
            Ok(bytes) => Ok(Some(bytes.to_vec())),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(txn_err(e)),
        }
    }
}

impl<'a> LmdbWriteTxn<'a> {
    pub fn new(txn: RwTransaction<'a>, state_db: Database, meta_db: Database) -> Self {
        Self {
            txn: Some(txn),
            state_db,
            meta_db,
            stats: CommitInfo::empty(),
        }
    }

    fn live(&mut self) -> Result<&mut RwTransaction<'a>> {
        self.txn
            .as_mut()
            .ok_or_else(|| TallyError::InvalidState("Transaction already committed".into()))
    }
}

impl StateRead for LmdbWriteTxn<'_> {
    fn get_state(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let txn = self
            .txn
            .as_ref()
            .ok_or_else(|| TallyError::InvalidState("Transaction already committed".into()))?;

        match txn.get(self.state_db, &key) {
            Ok(bytes) => Ok(Some(bytes.to_vec())),
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(txn_err(e)),
        }
    }
}

impl StateTxn for LmdbWriteTxn<'_> {
    fn put_state(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let db = self.state_db;
        self.live()?
            .put(db, &key, &value, WriteFlags::empty())
            .map_err(txn_err)?;
        self.stats.state_keys_written += 1;
        Ok(())
    }

    fn del_state(&mut self, key: &[u8]) -> Result<()> {
        let db = self.state_db;
        match self.live()?.del(db, &key, None) {
            Ok(()) => {
                self.stats.state_keys_deleted += 1;
                Ok(())
            }
            Err(lmdb::Error::NotFound) => Ok(()),
            Err(e) => Err(txn_err(e)),
        }
    }

    fn commit(mut self) -> Result<CommitInfo> {
        let meta_db = self.meta_db;
        let mut txn = self
            .txn
            .take()
            .ok_or_else(|| TallyError::InvalidState("Transaction already committed".into()))?;

        if !self.stats.is_empty() {
            txn.put(
                meta_db,
                &meta_keys::UPDATED_AT,
                &chrono::Utc::now().to_rfc3339(),
                WriteFlags::empty(),
            )
            .map_err(txn_err)?;
        }

        txn.commit().map_err(txn_err)?;
        Ok(self.stats.clone())
    }

    fn abort(mut self) {
        if let Some(txn) = self.txn.take() {
            txn.abort();
        }
    }
}

impl Drop for LmdbWriteTxn<'_> {
    fn drop(&mut self) {
        if let Some(txn) = self.txn.take() {
            txn.abort();
        }
    }
}
