//! Error types for the database core.

use thiserror::Error;

use crate::common::BlockId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the storage, buffer and locking layers.
///
/// Neither I/O failures nor lock aborts are retried inside the core; both are
/// returned to the caller carrying the block they concern where one exists.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error not tied to a particular block (directory creation, stat).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A seek, read or write of a block failed.
    #[error("I/O error on block {block}: {source}")]
    BlockIo {
        /// The block being accessed.
        block: BlockId,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Opening or sizing a file failed.
    #[error("I/O error on file {filename}: {source}")]
    FileIo {
        /// The file being accessed.
        filename: String,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A lock request waited past the configured ceiling.
    ///
    /// The owning transaction is expected to roll back.
    #[error("lock request on block {0} timed out")]
    LockAbort(BlockId),

    /// A page handed to the storage layer does not span exactly one block.
    #[error("page is {actual} bytes, expected block size {expected}")]
    PageSizeMismatch {
        /// The configured block size.
        expected: usize,
        /// The length of the page buffer.
        actual: usize,
    },

    /// The length prefix at `offset` is negative or runs past the page.
    #[error("invalid length {len} at offset {offset}")]
    InvalidLength {
        /// Byte offset of the length prefix.
        offset: usize,
        /// The stored length.
        len: i32,
    },

    /// The bytes stored at `offset` are not valid UTF-8.
    #[error("invalid string at offset {offset}")]
    InvalidString {
        /// Byte offset of the length prefix.
        offset: usize,
    },

    /// Buffer pool has no free frames and cannot evict any pages.
    ///
    /// This happens when all frames are pinned.
    #[error("no free frames available in buffer pool")]
    NoFreeFrames,

    /// A transaction touched a block it has not pinned.
    #[error("block {0} is not pinned by this transaction")]
    BlockNotPinned(BlockId),

    /// Attempted to drop a block from the pool while it is still pinned.
    #[error("block {0} is still pinned")]
    PagePinned(BlockId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::LockAbort(BlockId::new("student.tbl", 3));
        assert_eq!(
            err.to_string(),
            "lock request on block [file student.tbl, block 3] timed out"
        );

        let err = Error::NoFreeFrames;
        assert_eq!(err.to_string(), "no free frames available in buffer pool");
    }

    #[test]
    fn test_block_io_carries_source() {
        use std::error::Error as _;

        let err = Error::BlockIo {
            block: BlockId::new("log", 0),
            source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read"),
        };

        assert!(err.to_string().starts_with("I/O error on block [file log, block 0]"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_result_type_alias() {
        fn might_fail() -> Result<u32> {
            Ok(42)
        }

        assert_eq!(might_fail().unwrap(), 42);
    }
}
