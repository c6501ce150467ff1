//! Storage layer - block I/O and the page format.
//!
//! This module handles persistent storage:
//! - [`FileManager`] - Block reads, writes and appends over a directory of files
//! - [`page`] - The in-memory image of a block

mod file_manager;
pub mod page;

pub use file_manager::FileManager;
