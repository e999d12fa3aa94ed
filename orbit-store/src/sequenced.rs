//! Ordered-key queue strategy
//!
//! FIFO semantics over any `KeyValueStore`. Entries live under
//! `q:<sequence:u64 BE><tiebreak:4 random bytes>`; the sequence number is
//! claimed by compare-and-swap on a dedicated counter key, so
//! lexicographic key order is arrival order. Dequeue reads the least key
//! and deletes it conditioned on the value it read, which is what keeps
//! concurrent consumers from receiving the same entry twice.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::store::{check_cancel, KeyValueStore, QueueStore, StoreError};

/// Prefix for queue entries within the namespace.
const ENTRY_PREFIX: &[u8] = b"q:";

/// Counter key; outside `ENTRY_PREFIX` so scans never see it.
const SEQUENCE_KEY: &[u8] = b"seq";

/// Random suffix width appended to each entry key.
const TIEBREAK_LEN: usize = 4;

/// FIFO over an ordered-key backend.
pub struct SequencedQueue {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for SequencedQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencedQueue").finish_non_exhaustive()
    }
}

impl SequencedQueue {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Claim the next sequence number by CAS on the counter key.
    ///
    /// Contention never deadlocks: whenever this caller's swap fails,
    /// some other caller's swap succeeded and advanced the counter, so
    /// the retry observes fresh state. The loop is bounded only by
    /// cancellation.
    async fn next_sequence(&self, cancel: &CancellationToken) -> Result<u64, StoreError> {
        loop {
            check_cancel(cancel)?;
            let current = match self.store.get(cancel, SEQUENCE_KEY).await {
                Ok(raw) => Some(decode_sequence(&raw)?),
                Err(StoreError::NotFound) => None,
                Err(e) => return Err(e),
            };
            let next = current.unwrap_or(0) + 1;
            let current_bytes = current.map(u64::to_be_bytes);
            let swap = self
                .store
                .compare_and_swap(
                    cancel,
                    SEQUENCE_KEY,
                    current_bytes.as_ref().map(|b| b.as_slice()),
                    Some(&next.to_be_bytes()),
                )
                .await;
            match swap {
                Ok(()) => return Ok(next),
                Err(StoreError::Conflict)
                | Err(StoreError::AlreadyExists)
                | Err(StoreError::NotFound) => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl QueueStore for SequencedQueue {
    async fn push(&self, cancel: &CancellationToken, item: &[u8]) -> Result<(), StoreError> {
        let sequence = self.next_sequence(cancel).await?;

        let mut key = Vec::with_capacity(ENTRY_PREFIX.len() + 8 + TIEBREAK_LEN);
        key.extend_from_slice(ENTRY_PREFIX);
        key.extend_from_slice(&sequence.to_be_bytes());
        key.extend_from_slice(&rand::random::<[u8; TIEBREAK_LEN]>());

        self.store.put(cancel, &key, item).await
    }

    async fn pop(&self, cancel: &CancellationToken) -> Result<Vec<u8>, StoreError> {
        loop {
            check_cancel(cancel)?;
            let head = self.store.list(cancel, ENTRY_PREFIX, 1).await?;
            let Some((key, value)) = head.into_iter().next() else {
                return Err(StoreError::QueueEmpty);
            };
            match self
                .store
                .compare_and_swap(cancel, &key, Some(&value), None)
                .await
            {
                Ok(()) => return Ok(value),
                // Another consumer took this entry; retry from the new head.
                Err(StoreError::Conflict) | Err(StoreError::NotFound) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    async fn peek(
        &self,
        cancel: &CancellationToken,
        limit: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let entries = self.store.list(cancel, ENTRY_PREFIX, limit).await?;
        Ok(entries.into_iter().map(|(_, value)| value).collect())
    }
}

fn decode_sequence(raw: &[u8]) -> Result<u64, StoreError> {
    let bytes: [u8; 8] = raw
        .try_into()
        .map_err(|_| StoreError::Backend("malformed queue sequence counter".into()))?;
    Ok(u64::from_be_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn queue() -> SequencedQueue {
        SequencedQueue::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn pop_on_empty_reports_queue_empty() {
        let cancel = CancellationToken::new();
        assert!(matches!(
            queue().pop(&cancel).await,
            Err(StoreError::QueueEmpty)
        ));
    }

    #[tokio::test]
    async fn entries_come_back_in_push_order() {
        let queue = queue();
        let cancel = CancellationToken::new();
        for item in [&b"a"[..], b"b", b"c"] {
            queue.push(&cancel, item).await.unwrap();
        }

        assert_eq!(
            queue.peek(&cancel, 2).await.unwrap(),
            vec![b"a".to_vec(), b"b".to_vec()]
        );
        assert_eq!(queue.pop(&cancel).await.unwrap(), b"a");
        assert_eq!(queue.pop(&cancel).await.unwrap(), b"b");
        assert_eq!(queue.pop(&cancel).await.unwrap(), b"c");
    }

    #[tokio::test]
    async fn sequence_survives_drain() {
        // Draining the queue must not reset ordering for later pushes.
        let queue = queue();
        let cancel = CancellationToken::new();
        queue.push(&cancel, b"first").await.unwrap();
        queue.pop(&cancel).await.unwrap();
        queue.push(&cancel, b"second").await.unwrap();
        assert_eq!(queue.pop(&cancel).await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn cancellation_stops_push() {
        let queue = queue();
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(matches!(
            queue.push(&cancel, b"item").await,
            Err(StoreError::Cancelled)
        ));
    }
}
