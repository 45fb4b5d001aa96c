use crate::domain::ports::KeyValueStore;
use crate::error::{Result, SagaError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteOptions};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding serialized saga records.
pub const CF_SAGAS: &str = "sagas";

/// A persistent key-value store backed by RocksDB.
///
/// Saga records live in their own Column Family. Writes are synced so a transition is only
/// reported complete once it is durable.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbKeyValueStore {
    db: Arc<DB>,
}

impl RocksDbKeyValueStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the "sagas" column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_sagas = ColumnFamilyDescriptor::new(CF_SAGAS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_sagas])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn sagas_cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_SAGAS).ok_or_else(|| {
            SagaError::PersistenceError("Sagas column family not found".to_string())
        })
    }
}

#[async_trait]
impl KeyValueStore for RocksDbKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let cf = self.sagas_cf()?;
        Ok(self.db.get_cf(cf, key.as_bytes())?)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let cf = self.sagas_cf()?;
        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db.put_cf_opt(cf, key.as_bytes(), value, &write_opts)?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let cf = self.sagas_cf()?;
        // Just check if the key exists without copying the value
        let result = self.db.get_pinned_cf(cf, key.as_bytes())?;
        Ok(result.is_some())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let cf = self.sagas_cf()?;
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(())
    }
}
