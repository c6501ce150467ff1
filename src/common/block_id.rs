//! Block identifier type.

use std::fmt;

/// Identifies a fixed-size block within a file of the database directory.
///
/// Block `n` of a file starts at byte offset `n × block_size`. Two values
/// with the same file name and number refer to the same block and are
/// interchangeable everywhere, including as lock table keys.
///
/// Ordering is by file name, then block number.
///
/// # Example
/// ```
/// use blocklock::BlockId;
///
/// let block = BlockId::new("student.tbl", 7);
/// assert_eq!(block.filename(), "student.tbl");
/// assert_eq!(block.number(), 7);
/// assert_eq!(block.to_string(), "[file student.tbl, block 7]");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    filename: String,
    number: u64,
}

impl BlockId {
    /// Create a new BlockId.
    pub fn new(filename: impl Into<String>, number: u64) -> Self {
        Self {
            filename: filename.into(),
            number,
        }
    }

    /// Name of the file holding the block.
    #[inline]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Position of the block within its file.
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Byte offset of the block for the given block size, or `None` if it
    /// does not fit in a `u64`.
    #[inline]
    pub fn offset(&self, block_size: usize) -> Option<u64> {
        self.number.checked_mul(block_size as u64)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[file {}, block {}]", self.filename, self.number)
    }
}
