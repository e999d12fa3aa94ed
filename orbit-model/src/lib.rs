//! Orbit Model
//!
//! Pure data types shared across the satellite core, decoupled from
//! storage engines and wire encodings.

pub mod types;

pub use types::{NodeId, NODE_ID_LEN};
