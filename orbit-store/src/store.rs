//! Store abstraction
//!
//! The uniform byte-keyed interface every backend satisfies, plus the
//! queue capability that list-native backends implement directly and
//! ordered-key backends gain through `SequencedQueue`.
//!
//! Every operation takes a cancellation token as its first argument and
//! observes it at entry and at each suspension point; a cancelled
//! operation returns `StoreError::Cancelled` leaving persistent state
//! unchanged or atomically advanced exactly one step.

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by store and queue operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Key not found")]
    NotFound,

    #[error("Key already exists")]
    AlreadyExists,

    #[error("Compare-and-swap conflict")]
    Conflict,

    #[error("Queue is empty")]
    QueueEmpty,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported backend scheme: {0}")]
    UnsupportedBackend(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// Uniform interface over a byte-keyed store.
///
/// Keys and values are opaque byte strings. `list` ordering is
/// lexicographic over keys. Implementations must be internally
/// thread-safe; the handle is shared across workers.
#[async_trait]
pub trait KeyValueStore: Send + Sync + std::fmt::Debug {
    /// Fetch the value stored under `key`, or `NotFound`.
    async fn get(&self, cancel: &CancellationToken, key: &[u8]) -> Result<Vec<u8>, StoreError>;

    /// Store `value` under `key`, overwriting any previous value.
    async fn put(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        value: &[u8],
    ) -> Result<(), StoreError>;

    /// Remove the value stored under `key`; `NotFound` if absent.
    async fn delete(&self, cancel: &CancellationToken, key: &[u8]) -> Result<(), StoreError>;

    /// Return up to `limit` entries whose keys start with `prefix`, in
    /// lexicographic key order. `limit == 0` returns an empty list.
    async fn list(
        &self,
        cancel: &CancellationToken,
        prefix: &[u8],
        limit: usize,
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// Atomically replace the value under `key`, conditioned on the
    /// previously observed state.
    ///
    /// - `expected = None` requires the key to be absent; a present key
    ///   fails with `AlreadyExists`.
    /// - `expected = Some(v)` requires the current value to equal `v`
    ///   byte-for-byte; an absent key fails with `NotFound`, a differing
    ///   value with `Conflict`.
    /// - `new = Some(v)` writes `v`; `new = None` deletes the key.
    async fn compare_and_swap(
        &self,
        cancel: &CancellationToken,
        key: &[u8],
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<(), StoreError>;
}

/// FIFO capability over a backend.
///
/// At most one consumer receives a given item; fairness across consumers
/// is not guaranteed.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append `item` to the tail.
    async fn push(&self, cancel: &CancellationToken, item: &[u8]) -> Result<(), StoreError>;

    /// Remove and return the head item, or `QueueEmpty`. Never blocks
    /// waiting for an item.
    async fn pop(&self, cancel: &CancellationToken) -> Result<Vec<u8>, StoreError>;

    /// Return up to `limit` items from the head without removing them,
    /// preserving order. `limit == 0` returns an empty list.
    async fn peek(
        &self,
        cancel: &CancellationToken,
        limit: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError>;
}

/// Reject empty keys before they reach a backend.
pub(crate) fn check_key(key: &[u8]) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidArgument("empty key".into()));
    }
    Ok(())
}

/// Observe cancellation at an operation boundary.
pub(crate) fn check_cancel(cancel: &CancellationToken) -> Result<(), StoreError> {
    if cancel.is_cancelled() {
        return Err(StoreError::Cancelled);
    }
    Ok(())
}
