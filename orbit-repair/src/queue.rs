//! Injured-segment FIFO over a queue-capable backend.
//!
//! Entries are the wire-format serialization of `InjuredSegment`.
//! Enqueueing the same descriptor twice produces two entries; upstream
//! scanners own deduplication.

use std::sync::Arc;

use orbit_proto::InjuredSegment;
use orbit_store::{KeyValueStore, QueueStore, SequencedQueue, StoreError};
use prost::Message;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from repair-queue operations.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("Queue is empty")]
    QueueEmpty,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Entry decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RepairError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::QueueEmpty => RepairError::QueueEmpty,
            StoreError::Cancelled => RepairError::Cancelled,
            other => RepairError::Store(other),
        }
    }
}

/// Handle to the repair queue.
#[derive(Clone)]
pub struct RepairQueue {
    queue: Arc<dyn QueueStore>,
}

impl std::fmt::Debug for RepairQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairQueue").finish_non_exhaustive()
    }
}

impl RepairQueue {
    /// Wrap a backend with native queue support.
    pub fn new(queue: Arc<dyn QueueStore>) -> Self {
        Self { queue }
    }

    /// Run the queue over an ordered-key backend via the sequenced-key
    /// strategy.
    pub fn sequenced(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(Arc::new(SequencedQueue::new(store)))
    }

    /// Append a segment descriptor to the tail.
    pub async fn enqueue(
        &self,
        cancel: &CancellationToken,
        segment: &InjuredSegment,
    ) -> Result<(), RepairError> {
        if segment.path.is_empty() {
            return Err(RepairError::InvalidArgument("empty segment path".into()));
        }
        self.queue
            .push(cancel, &segment.encode_to_vec())
            .await
            .map_err(Into::into)
    }

    /// Remove and return the head descriptor, or `QueueEmpty`.
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<InjuredSegment, RepairError> {
        let raw = self.queue.pop(cancel).await?;
        Ok(InjuredSegment::decode(raw.as_slice())?)
    }

    /// Return up to `max` descriptors from the head without removing
    /// them, preserving order.
    pub async fn peek(
        &self,
        cancel: &CancellationToken,
        max: usize,
    ) -> Result<Vec<InjuredSegment>, RepairError> {
        let raw = self.queue.peek(cancel, max).await?;
        raw.iter()
            .map(|bytes| InjuredSegment::decode(bytes.as_slice()).map_err(Into::into))
            .collect()
    }
}
