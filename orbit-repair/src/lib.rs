//! Orbit Repair
//!
//! Durable FIFO of injured segments. Segment-health scanners enqueue
//! descriptors; repair workers dequeue them for reconstruction, each
//! entry delivered to exactly one worker. The queue holds no state of
//! its own beyond the backend handle, so producers and consumers share
//! one handle freely.

pub mod queue;

pub use queue::{RepairError, RepairQueue};
