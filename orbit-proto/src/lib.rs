//! Orbit Proto
//!
//! Wire-format records shared between the reputation ledger and the repair
//! queue. Messages are hand-written prost structs with fixed field tags so
//! the encoding stays stable without a protoc build step; the persisted
//! form of every record is its protobuf serialization.

pub mod records;

pub use records::{InjuredSegment, NodeStats};
