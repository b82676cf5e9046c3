use lmdb::{Database, DatabaseFlags, Environment, EnvironmentFlags, Transaction, WriteFlags};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tally_core::{
    config::SyncMode,
    error::{Result, TallyError},
    lock_manager::LockManager,
    traits::StateStore,
    types::{meta::SCHEMA_VERSION, StoreMeta},
    StoreConfig,
};

use crate::keys::{db_names, meta_keys};
use crate::txn::{LmdbReadTxn, LmdbWriteTxn};

/// LMDB-backed state store
pub struct LmdbStateStore {
    pub(crate) env: Arc<Environment>,
    pub(crate) state_db: Database,
    pub(crate) meta_db: Database,
    path: PathBuf,
    lock_manager: Arc<LockManager>,
}

pub(crate) fn txn_err(e: lmdb::Error) -> TallyError {
    TallyError::Transaction(e.to_string())
}

impl LmdbStateStore {
    fn get_meta<T: Transaction>(&self, txn: &T, key: &str) -> Result<Option<String>> {
        match txn.get(self.meta_db, &key) {
            Ok(bytes) => {
                let value = std::str::from_utf8(bytes)
                    .map_err(|e| TallyError::Serialization(e.to_string()))?
                    .to_string();
                Ok(Some(value))
            }
            Err(lmdb::Error::NotFound) => Ok(None),
            Err(e) => Err(txn_err(e)),
        }
    }

    /// Directory the environment lives in
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl StateStore for LmdbStateStore {
    type Txn<'a> = LmdbWriteTxn<'a>;
    type ReadTxn<'a> = LmdbReadTxn<'a>;

    fn open(cfg: StoreConfig) -> Result<Self> {
        cfg.validate()?;
        std::fs::create_dir_all(&cfg.path)?;

        let mut env_builder = Environment::new();
        env_builder.set_max_dbs(2); // state, meta
        env_builder.set_map_size(cfg.map_size);
        env_builder.set_max_readers(cfg.max_readers);

        let mut flags = EnvironmentFlags::empty();
        match cfg.sync_mode {
            SyncMode::Full => {}
            SyncMode::NoMetaSync => flags.insert(EnvironmentFlags::NO_META_SYNC),
            SyncMode::NoSync => flags.insert(EnvironmentFlags::NO_SYNC),
        }
        env_builder.set_flags(flags);

        let env = env_builder
            .open(&cfg.path)
            .map_err(|e| TallyError::Io(std::io::Error::other(e)))?;

        let state_db = env
            .create_db(Some(db_names::STATE), DatabaseFlags::empty())
            .map_err(txn_err)?;
        let meta_db = env
            .create_db(Some(db_names::META), DatabaseFlags::empty())
            .map_err(txn_err)?;

        {
            let mut txn = env.begin_rw_txn().map_err(txn_err)?;

            if txn.get(meta_db, &meta_keys::SCHEMA_VERSION).is_err() {
                txn.put(
                    meta_db,
                    &meta_keys::SCHEMA_VERSION,
                    &SCHEMA_VERSION.to_string(),
                    WriteFlags::empty(),
                )
                .map_err(txn_err)?;
            }

            let now = chrono::Utc::now().to_rfc3339();
            if txn.get(meta_db, &meta_keys::CREATED_AT).is_err() {
                txn.put(meta_db, &meta_keys::CREATED_AT, &now, WriteFlags::empty())
                    .map_err(txn_err)?;
            }
            txn.put(meta_db, &meta_keys::UPDATED_AT, &now, WriteFlags::empty())
                .map_err(txn_err)?;

            txn.commit().map_err(txn_err)?;
        }

        tracing::info!(path = %cfg.path.display(), "Opened LMDB state store");

        Ok(Self {
            env: Arc::new(env),
            state_db,
            meta_db,
            path: cfg.path.clone(),
            lock_manager: Arc::new(LockManager::new(
                cfg.stripe_count,
                Duration::from_millis(cfg.lock_timeout_ms),
            )),
        })
    }

    fn close(&self) -> Result<()> {
        // LMDB flushes and closes the environment on drop
        tracing::info!(path = %self.path.display(), "Closing LMDB state store");
        Ok(())
    }

    fn write_txn(&self) -> Result<Self::Txn<'_>> {
        // Blocks while another unit holds LMDB's single writer slot
        let txn = self.env.begin_rw_txn().map_err(txn_err)?;
        Ok(LmdbWriteTxn::new(txn, self.state_db, self.meta_db))
    }

    fn read_txn(&self) -> Result<Self::ReadTxn<'_>> {
        let txn = self.env.begin_ro_txn().map_err(txn_err)?;
        Ok(LmdbReadTxn::new(txn, self.state_db))
    }

    fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    fn meta(&self) -> Result<StoreMeta> {
        let txn = self.env.begin_ro_txn().map_err(txn_err)?;

        let schema_version = self
            .get_meta(&txn, meta_keys::SCHEMA_VERSION)?
            .and_then(|s| s.parse().ok())
            .unwrap_or(SCHEMA_VERSION);
        let created_at = self
            .get_meta(&txn, meta_keys::CREATED_AT)?
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
        let updated_at = self
            .get_meta(&txn, meta_keys::UPDATED_AT)?
            .unwrap_or_else(|| created_at.clone());

        Ok(StoreMeta {
            schema_version,
            created_at,
            updated_at,
        })
    }
}
