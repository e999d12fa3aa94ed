//! Embedded single-file store
//!
//! Durable B-tree backend over redb. One named table per namespace keeps
//! reputation records and queue entries in separate keyspaces inside the
//! same file. Every mutation runs in its own committed write transaction,
//! so each acknowledged write has reached disk; redb serializes writers
//! and leaves readers concurrent.

use std::path::Path;

use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use tokio_util::sync::CancellationToken;

use crate::store::{check_cancel, check_key, KeyValueStore, StoreError};

/// Single-file store selected by `bolt:` URLs.
pub struct EmbeddedStore {
    db: Database,
    table: String,
}

impl std::fmt::Debug for EmbeddedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl EmbeddedStore {
    /// Open or create the store file and the namespace table inside it.
    pub fn open(path: impl AsRef<Path>, namespace: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if namespace.is_empty() {
            return Err(StoreError::InvalidArgument("empty namespace".into()));
        }
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let db = Database::create(path)?;
        let store = Self {
            db,
            table: namespace.to_string(),
        };

        // Create the table eagerly so reads before the first write see an
        // empty table instead of TableDoesNotExist.
        let txn = store.db.begin_write()?;
        txn.open_table(store.table_def())?;
        txn.commit()?;

        Ok(store)
    }

    fn table_def(&self) -> TableDefinition<'_, &'static [u8], &'static [u8]> {
        TableDefinition::new(&self.table)
    }
}

#[async_trait]
impl KeyValueStore for EmbeddedStore {
    async fn get(&self, cancel: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        check_cancel(cancel)?;
        check_key(key)?;
        let txn = self.db.begin_read()?;
        let table = txn.open_table(self.table_def())?;
        match table.get(key)? {
            Some(guard) => Ok(guard.value().to_vec()),
            None => Err(StoreError::NotFound),
        }
    }

    async fn put(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), StoreError> {
        check_cancel(cancel)?;
        check_key(key)?;
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(self.table_def())?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    async fn delete(&self, cancel: &CancellationToken, key: &[u8]) -> Result<(), StoreError> {
        check_cancel(cancel)?;
        check_key(key)?;
        let txn = self.db.begin_write()?;
        let existed = {
            let mut table = txn.open_table(self.table_def())?;
            let removed = table.remove(key)?.is_some();
            removed
        };
        txn.commit()?;
        if existed {
            Ok(())
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        check_cancel(cancel)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(self.table_def()) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for item in table.range(prefix..)? {
            let (key_guard, value_guard) = item?;
            let key = key_guard.value();
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value_guard.value().to_vec()));
            if entries.len() == limit {
                break;
            }
        }
        Ok(entries)
    }

    async fn compare_and_swap(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<(), StoreError> {
        check_cancel(cancel)?;
        check_key(key)?;
        // redb admits a single writer at a time, so the read-check-write
        // below is atomic against every other mutation; bailing out drops
        // the transaction, which aborts it.
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(self.table_def())?;
            let current = table.get(key)?.map(|guard| guard.value().to_vec());
            match (expected, current.as_deref()) {
                (None, Some(_)) => return Err(StoreError::AlreadyExists),
                (Some(_), None) => return Err(StoreError::NotFound),
                (Some(want), Some(have)) if want != have => return Err(StoreError::Conflict),
                _ => {}
            }
            match new {
                Some(value) => {
                    table.insert(key, value)?;
                }
                None => {
                    table.remove(key)?;
                }
            }
        }
        txn.commit()?;
        Ok(())
    }
}

// Map engine errors into the uniform backend kind.

impl From<redb::DatabaseError> for StoreError {
    fn from(e: redb::DatabaseError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}
