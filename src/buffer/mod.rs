//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between transactions and the
//! [`FileManager`](crate::storage::FileManager). It manages a fixed pool of
//! frames, each holding one block's page.
//!
//! # Components
//! - [`BufferPoolManager`] - The block cache
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards for page access
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy implementations

mod buffer_pool_manager;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::Frame;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
