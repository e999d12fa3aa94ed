//! Reputation records: create/get/update/batch/query.
//!
//! Counters are authoritative; ratios are re-derived from them on every
//! mutation and stored alongside so reads stay constant-time. A node
//! with zero observations in a dimension has ratio 0 by convention and
//! is never considered invalid in that dimension.

use std::collections::HashSet;
use std::sync::Arc;

use orbit_model::NodeId;
use orbit_proto::NodeStats;
use orbit_store::{KeyValueStore, StoreError};
use prost::Message;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Attempts per record before update contention is surfaced.
pub const CAS_RETRY_LIMIT: usize = 8;

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum StatDbError {
    #[error("Node not found")]
    NotFound,

    #[error("Node already exists")]
    AlreadyExists,

    #[error("Update contention for node {0}")]
    Contention(NodeId),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Record decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for StatDbError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => StatDbError::NotFound,
            StoreError::AlreadyExists => StatDbError::AlreadyExists,
            StoreError::Cancelled => StatDbError::Cancelled,
            other => StatDbError::Store(other),
        }
    }
}

/// A single audit/uptime observation for one node.
///
/// Absent fields leave the corresponding counters untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub node_id: NodeId,
    pub audit_success: Option<bool>,
    pub is_up: Option<bool>,
}

/// Handle to the reputation ledger.
///
/// Holds no state beyond the backend handle; clones share the backend.
#[derive(Clone)]
pub struct StatDb {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for StatDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatDb").finish_non_exhaustive()
    }
}

impl StatDb {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persist a new record; fails with `AlreadyExists` if the node is
    /// already registered. The stored ratios are recomputed from the
    /// initial counts.
    pub async fn create(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
        initial: NodeStats,
    ) -> Result<NodeStats, StatDbError> {
        validate_counts(&initial)?;
        let stats = normalized(node_id, initial);
        let bytes = stats.encode_to_vec();
        self.store
            .compare_and_swap(cancel, node_id.as_bytes(), None, Some(&bytes))
            .await?;
        Ok(stats)
    }

    /// Fetch the record for a registered node, or create a zeroed one.
    ///
    /// Losing the creation race to a concurrent caller falls back to a
    /// plain read.
    pub async fn create_entry_if_not_exists(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
    ) -> Result<NodeStats, StatDbError> {
        match self.get(cancel, node_id).await {
            Err(StatDbError::NotFound) => {}
            other => return other,
        }
        match self.create(cancel, node_id, NodeStats::default()).await {
            Err(StatDbError::AlreadyExists) => self.get(cancel, node_id).await,
            other => other,
        }
    }

    /// Fetch the record for `node_id`, or `NotFound`.
    pub async fn get(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
    ) -> Result<NodeStats, StatDbError> {
        let raw = self.store.get(cancel, node_id.as_bytes()).await?;
        Ok(NodeStats::decode(raw.as_slice())?)
    }

    /// Apply one observation atomically and return the updated record.
    ///
    /// The read-modify-write runs under compare-and-swap; a concurrent
    /// writer triggers a retry with the fresh record, up to
    /// `CAS_RETRY_LIMIT` attempts.
    pub async fn update(
        &self,
        cancel: &CancellationToken,
        request: &UpdateRequest,
    ) -> Result<NodeStats, StatDbError> {
        let key = request.node_id.as_bytes();
        for _ in 0..CAS_RETRY_LIMIT {
            if cancel.is_cancelled() {
                return Err(StatDbError::Cancelled);
            }
            let current = self.store.get(cancel, key).await?;
            let mut stats = NodeStats::decode(current.as_slice())?;
            apply_observation(&mut stats, request);
            let next = stats.encode_to_vec();
            match self
                .store
                .compare_and_swap(cancel, key, Some(&current), Some(&next))
                .await
            {
                Ok(()) => return Ok(stats),
                Err(StoreError::Conflict) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        tracing::warn!(
            node = %request.node_id,
            attempts = CAS_RETRY_LIMIT,
            "reputation update contention retries exhausted"
        );
        Err(StatDbError::Contention(request.node_id))
    }

    /// Record one liveness ping.
    pub async fn update_uptime(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
        is_up: bool,
    ) -> Result<NodeStats, StatDbError> {
        self.update(
            cancel,
            &UpdateRequest {
                node_id,
                audit_success: None,
                is_up: Some(is_up),
            },
        )
        .await
    }

    /// Record one audit outcome.
    pub async fn update_audit_success(
        &self,
        cancel: &CancellationToken,
        node_id: NodeId,
        audit_success: bool,
    ) -> Result<NodeStats, StatDbError> {
        self.update(
            cancel,
            &UpdateRequest {
                node_id,
                audit_success: Some(audit_success),
                is_up: None,
            },
        )
        .await
    }

    /// Apply each update independently; per-record failures are collected
    /// and returned alongside the successes instead of aborting the batch.
    ///
    /// Successes preserve input order. Records are not transactional
    /// across each other; a cancellation mid-batch surfaces `Cancelled`
    /// and leaves already-applied updates in place.
    pub async fn update_batch(
        &self,
        cancel: &CancellationToken,
        requests: &[UpdateRequest],
    ) -> Result<(Vec<NodeStats>, Vec<UpdateRequest>), StatDbError> {
        let mut updated = Vec::with_capacity(requests.len());
        let mut failed = Vec::new();
        for request in requests {
            match self.update(cancel, request).await {
                Ok(stats) => updated.push(stats),
                Err(StatDbError::Cancelled) => return Err(StatDbError::Cancelled),
                Err(e) => {
                    tracing::debug!(node = %request.node_id, error = %e, "batch update entry failed");
                    failed.push(request.clone());
                }
            }
        }
        Ok((updated, failed))
    }

    /// Of the candidate nodes, return those whose observed ratios fall
    /// below the given thresholds.
    ///
    /// A dimension with zero observations never disqualifies a node, and
    /// candidates without a record are skipped. Duplicate candidates are
    /// considered once; the result preserves first-seen order.
    pub async fn find_invalid_nodes(
        &self,
        cancel: &CancellationToken,
        node_ids: &[NodeId],
        max_stats: &NodeStats,
    ) -> Result<Vec<NodeId>, StatDbError> {
        let mut seen = HashSet::new();
        let mut invalid = Vec::new();
        for &node_id in node_ids {
            if !seen.insert(node_id) {
                continue;
            }
            let stats = match self.get(cancel, node_id).await {
                Ok(stats) => stats,
                Err(StatDbError::NotFound) => continue,
                Err(e) => return Err(e),
            };
            if is_invalid(&stats, max_stats) {
                invalid.push(node_id);
            }
        }
        Ok(invalid)
    }
}

fn is_invalid(stats: &NodeStats, max_stats: &NodeStats) -> bool {
    (stats.audit_count > 0 && stats.audit_success_ratio < max_stats.audit_success_ratio)
        || (stats.uptime_count > 0 && stats.uptime_ratio < max_stats.uptime_ratio)
}

fn apply_observation(stats: &mut NodeStats, request: &UpdateRequest) {
    if let Some(audit_success) = request.audit_success {
        stats.audit_count += 1;
        if audit_success {
            stats.audit_success_count += 1;
        }
    }
    if let Some(is_up) = request.is_up {
        stats.uptime_count += 1;
        if is_up {
            stats.uptime_success_count += 1;
        }
    }
    stats.audit_success_ratio = ratio(stats.audit_success_count, stats.audit_count);
    stats.uptime_ratio = ratio(stats.uptime_success_count, stats.uptime_count);
}

fn normalized(node_id: NodeId, mut stats: NodeStats) -> NodeStats {
    stats.node_id = node_id.as_bytes().to_vec();
    stats.audit_success_ratio = ratio(stats.audit_success_count, stats.audit_count);
    stats.uptime_ratio = ratio(stats.uptime_success_count, stats.uptime_count);
    stats
}

fn validate_counts(stats: &NodeStats) -> Result<(), StatDbError> {
    if stats.audit_count < 0
        || stats.audit_success_count < 0
        || stats.uptime_count < 0
        || stats.uptime_success_count < 0
    {
        return Err(StatDbError::InvalidArgument("negative counter".into()));
    }
    if stats.audit_success_count > stats.audit_count {
        return Err(StatDbError::InvalidArgument(
            "audit successes exceed audit count".into(),
        ));
    }
    if stats.uptime_success_count > stats.uptime_count {
        return Err(StatDbError::InvalidArgument(
            "uptime successes exceed uptime count".into(),
        ));
    }
    Ok(())
}

fn ratio(success: i64, total: i64) -> f64 {
    if total > 0 {
        success as f64 / total as f64
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_total_yields_zero_ratio() {
        assert_eq!(ratio(0, 0), 0.0);
        assert_eq!(ratio(4, 10), 0.4);
    }

    #[test]
    fn zero_count_dimension_never_disqualifies() {
        let max_stats = NodeStats {
            audit_success_ratio: 0.5,
            uptime_ratio: 0.5,
            ..Default::default()
        };
        let pristine = NodeStats::default();
        assert!(!is_invalid(&pristine, &max_stats));

        let one_bad_audit = NodeStats {
            audit_count: 1,
            ..Default::default()
        };
        assert!(is_invalid(&one_bad_audit, &max_stats));
    }

    #[test]
    fn create_counts_are_validated() {
        let bad = NodeStats {
            audit_count: 1,
            audit_success_count: 2,
            ..Default::default()
        };
        assert!(matches!(
            validate_counts(&bad),
            Err(StatDbError::InvalidArgument(_))
        ));
    }
}
