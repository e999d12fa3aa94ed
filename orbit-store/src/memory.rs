//! In-memory test store
//!
//! Process-local reference implementation: an ordered map behind a mutex.
//! Every trait semantic holds trivially here, which is what makes it the
//! yardstick for the backend compliance tests and benchmarks.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::store::{check_cancel, check_key, KeyValueStore, QueueStore, StoreError};

/// Mutex-guarded ordered map satisfying `KeyValueStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>> {
        // A poisoned lock means some holder already panicked; the map
        // itself is still usable.
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, cancel: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        check_cancel(cancel)?;
        check_key(key)?;
        self.lock().get(key).cloned().ok_or(StoreError::NotFound)
    }

    async fn put(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), StoreError> {
        check_cancel(cancel)?;
        check_key(key)?;
        self.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, cancel: &CancellationToken, key: &[u8]) -> Result<(), StoreError> {
        check_cancel(cancel)?;
        check_key(key)?;
        match self.lock().remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
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
        let data = self.lock();
        Ok(data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
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
        let mut data = self.lock();
        match (expected, data.get(key)) {
            (None, Some(_)) => return Err(StoreError::AlreadyExists),
            (Some(_), None) => return Err(StoreError::NotFound),
            (Some(want), Some(current)) if want != current.as_slice() => {
                return Err(StoreError::Conflict)
            }
            _ => {}
        }
        match new {
            Some(value) => {
                data.insert(key.to_vec(), value.to_vec());
            }
            None => {
                data.remove(key);
            }
        }
        Ok(())
    }
}

/// Mutex-guarded FIFO; the queue test double.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    items: Mutex<VecDeque<Vec<u8>>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Vec<u8>>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl QueueStore for MemoryQueue {
    async fn push(&self, cancel: &CancellationToken, item: &[u8]) -> Result<(), StoreError> {
        check_cancel(cancel)?;
        self.lock().push_back(item.to_vec());
        Ok(())
    }

    async fn pop(&self, cancel: &CancellationToken) -> Result<Vec<u8>, StoreError> {
        check_cancel(cancel)?;
        self.lock().pop_front().ok_or(StoreError::QueueEmpty)
    }

    async fn peek(
        &self,
        cancel: &CancellationToken,
        limit: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        check_cancel(cancel)?;
        Ok(self.lock().iter().take(limit).cloned().collect())
    }
}
