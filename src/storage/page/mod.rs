//! Page type.
//!
//! This module contains [`Page`], the in-memory image of one block.

#[allow(clippy::module_inception)]
mod page;

pub use page::Page;
