//! Observability decorator
//!
//! Wraps a store or queue handle and emits one structured event per call
//! under a backend-scoped name. The wrapper is transparent: results and
//! error kinds pass through untouched.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::store::{KeyValueStore, QueueStore, StoreError};

/// Logging wrapper over a key-value store handle.
#[derive(Debug)]
pub struct LoggedStore {
    name: String,
    inner: Arc<dyn KeyValueStore>,
}

impl LoggedStore {
    pub fn new(name: impl Into<String>, inner: Arc<dyn KeyValueStore>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    fn record<T>(&self, op: &str, key: &[u8], size: usize, result: &Result<T, StoreError>) {
        match result {
            Ok(_) => tracing::debug!(
                store = %self.name,
                op,
                key = %hex::encode(key),
                size,
                "store op"
            ),
            Err(e) => tracing::debug!(
                store = %self.name,
                op,
                key = %hex::encode(key),
                size,
                error = %e,
                "store op failed"
            ),
        }
    }
}

#[async_trait]
impl KeyValueStore for LoggedStore {
    async fn get(&self, cancel: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        let result = self.inner.get(cancel, key).await;
        let size = result.as_ref().map(Vec::len).unwrap_or(0);
        self.record("get", key, size, &result);
        result
    }

    async fn put(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), StoreError> {
        let result = self.inner.put(cancel, key, value).await;
        self.record("put", key, value.len(), &result);
        result
    }

    async fn delete(&self, cancel: &CancellationToken, key: &[u8]) -> Result<(), StoreError> {
        let result = self.inner.delete(cancel, key).await;
        self.record("delete", key, 0, &result);
        result
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let result = self.inner.list(cancel, prefix, limit).await;
        let size = result.as_ref().map(Vec::len).unwrap_or(0);
        self.record("list", prefix, size, &result);
        result
    }

    async fn compare_and_swap(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<(), StoreError> {
        let result = self.inner.compare_and_swap(cancel, key, expected, new).await;
        let size = new.map(<[u8]>::len).unwrap_or(0);
        self.record("compare_and_swap", key, size, &result);
        result
    }
}

/// Logging wrapper over a queue handle.
pub struct LoggedQueue {
    name: String,
    inner: Arc<dyn QueueStore>,
}

impl LoggedQueue {
    pub fn new(name: impl Into<String>, inner: Arc<dyn QueueStore>) -> Self {
        Self {
            name: name.into(),
            inner,
        }
    }

    fn record<T>(&self, op: &str, size: usize, result: &Result<T, StoreError>) {
        match result {
            Ok(_) => tracing::debug!(queue = %self.name, op, size, "queue op"),
            Err(e) => tracing::debug!(queue = %self.name, op, size, error = %e, "queue op failed"),
        }
    }
}

#[async_trait]
impl QueueStore for LoggedQueue {
    async fn push(&self, cancel: &CancellationToken, item: &[u8]) -> Result<(), StoreError> {
        let result = self.inner.push(cancel, item).await;
        self.record("push", item.len(), &result);
        result
    }

    async fn pop(&self, cancel: &CancellationToken) -> Result<Vec<u8>, StoreError> {
        let result = self.inner.pop(cancel).await;
        let size = result.as_ref().map(Vec::len).unwrap_or(0);
        self.record("pop", size, &result);
        result
    }

    async fn peek(
        &self,
        cancel: &CancellationToken,
        limit: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let result = self.inner.peek(cancel, limit).await;
        let size = result.as_ref().map(Vec::len).unwrap_or(0);
        self.record("peek", size, &result);
        result
    }
}
