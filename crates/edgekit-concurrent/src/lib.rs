//! Thread-safe containers for edgekit
//!
//! - `queue`: Unbounded FIFO guarded by a single exclusive lock

pub mod queue;

pub use queue::{QueueError, SafeQueue};
