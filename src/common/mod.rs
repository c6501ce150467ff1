//! Common types and utilities shared across the crate.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`DbConfig`](config::DbConfig)
//! - Error types
//! - Identifiers (BlockId, FrameId, TransactionId)

mod block_id;
pub mod config;
pub mod error;
mod frame_id;
mod txn_id;

pub use block_id::BlockId;
pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use txn_id::TransactionId;
