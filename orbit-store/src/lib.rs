//! Orbit Store
//!
//! Pluggable byte-keyed storage for the satellite core. One abstraction,
//! three interchangeable backends:
//!
//! - `EmbeddedStore`: durable single-file B-tree store (redb), one named
//!   table per namespace. Selected by `bolt:` URLs.
//! - `RedisStore`: remote in-memory store with native list primitives for
//!   queue workloads. Selected by `redis:` URLs.
//! - `MemoryStore`: mutex-guarded ordered map; the reference
//!   implementation used by tests. Selected by `mem:` URLs.
//!
//! `SequencedQueue` layers FIFO semantics over any ordered-key backend,
//! and `LoggedStore`/`LoggedQueue` decorate either trait with structured
//! observability events.

pub mod embedded;
pub mod logged;
pub mod memory;
pub mod remote;
pub mod sequenced;
pub mod store;
pub mod url;

pub use embedded::EmbeddedStore;
pub use logged::{LoggedQueue, LoggedStore};
pub use memory::{MemoryQueue, MemoryStore};
pub use remote::RedisStore;
pub use sequenced::SequencedQueue;
pub use store::{KeyValueStore, QueueStore, StoreError};
pub use url::{open_store, parse_store_url};
