//! Page - the in-memory image of one block.
//!
//! A [`Page`] is a raw byte buffer exactly one block long. It knows nothing
//! about which block it mirrors; the caller makes that association.

use crate::common::config::INT_SIZE;
use crate::common::{Error, Result};

/// A block-sized byte buffer with typed accessors at byte offsets.
///
/// # Value Encoding
/// ```text
/// int:    [ i32 big-endian (4) ]
/// bytes:  [ len i32 big-endian (4) ][ len bytes ]
/// string: stored as bytes holding its UTF-8 encoding
/// ```
///
/// Offsets are chosen by the caller. An access that runs past the end of the
/// page is a programmer error and panics.
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code; copying a block
/// should be explicit. A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use blocklock::Page;
///
/// let mut page = Page::new(400);
/// page.set_int(0, 345);
/// page.set_string(4, "abcdefghijklm");
/// assert_eq!(page.get_int(0), 345);
/// assert_eq!(page.get_string(4).unwrap(), "abcdefghijklm");
/// ```
pub struct Page {
    data: Box<[u8]>,
}

impl Page {
    /// Create a new zeroed page of `block_size` bytes.
    pub fn new(block_size: usize) -> Self {
        Self {
            data: vec![0u8; block_size].into_boxed_slice(),
        }
    }

    /// Wrap an existing buffer; the page takes its length.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            data: bytes.into_boxed_slice(),
        }
    }

    /// Length of the page in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the page has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read the integer stored at `offset`.
    pub fn get_int(&self, offset: usize) -> i32 {
        let mut buf = [0u8; INT_SIZE];
        buf.copy_from_slice(&self.data[offset..offset + INT_SIZE]);
        i32::from_be_bytes(buf)
    }

    /// Store an integer at `offset`.
    pub fn set_int(&mut self, offset: usize, value: i32) {
        self.data[offset..offset + INT_SIZE].copy_from_slice(&value.to_be_bytes());
    }

    /// Read the length-prefixed byte blob stored at `offset`.
    ///
    /// # Errors
    /// Returns `Error::InvalidLength` if the stored length is negative or
    /// the blob would run past the end of the page.
    pub fn get_bytes(&self, offset: usize) -> Result<&[u8]> {
        let len = self.get_int(offset);
        let start = offset + INT_SIZE;
        usize::try_from(len)
            .ok()
            .and_then(|n| start.checked_add(n))
            .filter(|&end| end <= self.data.len())
            .map(|end| &self.data[start..end])
            .ok_or(Error::InvalidLength { offset, len })
    }

    /// Store a length-prefixed byte blob at `offset`.
    ///
    /// # Panics
    /// Panics if the blob does not fit in the page at `offset`.
    pub fn set_bytes(&mut self, offset: usize, bytes: &[u8]) {
        let start = offset + INT_SIZE;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        let Ok(len) = i32::try_from(bytes.len()) else {
            panic!("blob of {} bytes exceeds the length prefix", bytes.len());
        };
        self.set_int(offset, len);
    }

    /// Read the string stored at `offset`.
    ///
    /// # Errors
    /// - `Error::InvalidLength` if the length prefix is corrupt
    /// - `Error::InvalidString` if the stored bytes are not UTF-8
    pub fn get_string(&self, offset: usize) -> Result<String> {
        std::str::from_utf8(self.get_bytes(offset)?)
            .map(str::to_owned)
            .map_err(|_| Error::InvalidString { offset })
    }

    /// Store a string at `offset`.
    pub fn set_string(&mut self, offset: usize, value: &str) {
        self.set_bytes(offset, value.as_bytes());
    }

    /// Worst-case number of bytes needed to store a string of `strlen` chars.
    pub const fn max_length(strlen: usize) -> usize {
        // A char takes at most 4 bytes in UTF-8.
        INT_SIZE + strlen * 4
    }

    /// The whole underlying buffer.
    #[inline]
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// The whole underlying buffer, mutably.
    #[inline]
    pub fn contents_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        Page::from_bytes(self.data.to_vec())
    }
}

// ============================================================================
// TESTS
// ============================================================================
