//! Record schemas for node reputation and segment repair.
//!
//! Field tags are part of the wire contract; never renumber them.

/// Per-node reputation record.
///
/// The counters are authoritative; the ratio fields are re-derived from
/// them on every mutation and stored alongside so reads stay constant-time.
#[derive(Clone, PartialEq, prost::Message)]
pub struct NodeStats {
    #[prost(double, tag = "1")]
    pub audit_success_ratio: f64,

    #[prost(double, tag = "2")]
    pub uptime_ratio: f64,

    #[prost(int64, tag = "3")]
    pub audit_count: i64,

    #[prost(int64, tag = "4")]
    pub audit_success_count: i64,

    #[prost(int64, tag = "5")]
    pub uptime_count: i64,

    #[prost(int64, tag = "6")]
    pub uptime_success_count: i64,

    #[prost(bytes = "vec", tag = "7")]
    pub node_id: Vec<u8>,
}

/// Descriptor of a segment whose pieces have dropped below the erasure
/// threshold, queued for reconstruction.
#[derive(Clone, PartialEq, prost::Message)]
pub struct InjuredSegment {
    /// Object/segment locator; opaque to the queue.
    #[prost(bytes = "vec", tag = "1")]
    pub path: Vec<u8>,

    /// Indices of the erasure-coded pieces that are missing.
    #[prost(int32, repeated, tag = "2")]
    pub lost_pieces: Vec<i32>,
}
