//! Eviction policy implementations (replacers).
//!
//! Currently implements:
//! - [`FifoReplacer`] - evicts the longest-resident unpinned frame

mod fifo;

pub use fifo::FifoReplacer;
