//! Orbit StatDB
//!
//! Per-node reputation ledger. Audit workers and uptime pingers feed
//! monotonically accumulated counters; placement and repair consult the
//! derived success ratios to exclude unreliable nodes. Records live in
//! any `KeyValueStore` backend, keyed by raw node id, and every mutation
//! is an atomic compare-and-swap so updates on a single node serialize
//! regardless of how many workers share the handle.

pub mod statdb;

pub use statdb::{StatDb, StatDbError, UpdateRequest, CAS_RETRY_LIMIT};
