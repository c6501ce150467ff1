//! Concurrency control - block locking and transactions.
//!
//! # Components
//! - [`LockTable`] - Shared S/X locks on blocks with a bounded wait
//! - [`ConcurrencyManager`] - Per-transaction lock record (strict 2PL)
//! - [`Transaction`] - Unit of work tying locks to buffer pool access
//!
//! # Flow
//! ```text
//! Transaction ──▶ ConcurrencyManager ──▶ LockTable (shared)
//!      │
//!      └─────────▶ BufferPoolManager ──▶ FileManager
//! ```

mod concurrency_manager;
mod lock_table;
mod transaction;

pub use concurrency_manager::{ConcurrencyManager, LockMode};
pub use lock_table::{LockState, LockTable};
pub use transaction::Transaction;
