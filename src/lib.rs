//! blocklock - a block-oriented database core with strict two-phase locking.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Database                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │          Transaction Layer (concurrency/)                │   │
//! │  │  Transaction → ConcurrencyManager → LockTable (shared)   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Buffer Pool (buffer/)                       │   │
//! │  │    BufferPoolManager + Frame + FifoReplacer + Stats      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │              FileManager + Page                          │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A transaction locks a block before touching it: shared to read,
//! exclusive to write. Locks are held until commit or rollback. A lock
//! request that waits longer than the configured ceiling fails with
//! [`Error::LockAbort`] and the transaction is expected to roll back.
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockId, FrameId, Error, config)
//! - [`storage`] - Block I/O and pages
//! - [`buffer`] - Buffer pool management
//! - [`concurrency`] - Lock table, concurrency manager, transactions
//!
//! # Quick Start
//! ```no_run
//! use blocklock::{Database, DbConfig};
//!
//! let db = Database::open("my_database", DbConfig::default())?;
//! let mut tx = db.new_transaction();
//!
//! let block = tx.append("accounts.tbl")?;
//! tx.pin(&block)?;
//! tx.set_string(&block, 0, "alice")?;
//! tx.commit()?;
//! # Ok::<(), blocklock::Error>(())
//! ```

pub mod buffer;
pub mod common;
pub mod concurrency;
mod database;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{DbConfig, DEFAULT_BLOCK_SIZE};
pub use common::{BlockId, Error, FrameId, Result, TransactionId};

pub use buffer::{BufferPoolManager, BufferPoolStats, Frame, StatsSnapshot};
pub use concurrency::{ConcurrencyManager, LockMode, LockState, LockTable, Transaction};
pub use database::Database;
pub use storage::page::Page;
pub use storage::FileManager;
