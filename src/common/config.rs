//! Configuration constants and the database configuration struct.

use std::time::Duration;

/// Default size of a block (and of the page mirroring it) in bytes.
///
/// Matches the OS page size on most systems. The block size is fixed for the
/// lifetime of a database directory; reopening with a different value
/// misinterprets every file in it.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// Default number of frames in the buffer pool.
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 8;

/// Default ceiling on how long a lock request may wait before it aborts.
///
/// A request still waiting after this long is assumed to be part of a
/// deadlock and fails with [`Error::LockAbort`](crate::Error::LockAbort).
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Size in bytes of the length prefix and of an integer stored in a page.
pub const INT_SIZE: usize = 4;

/// Settings used by [`Database::open`](crate::Database::open).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use blocklock::DbConfig;
///
/// let config = DbConfig::default()
///     .with_block_size(400)
///     .with_lock_timeout(Duration::from_millis(500));
/// assert_eq!(config.block_size, 400);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbConfig {
    /// Bytes per block.
    pub block_size: usize,
    /// Frames in the buffer pool.
    pub buffer_pool_size: usize,
    /// Maximum time a lock request waits.
    pub lock_timeout: Duration,
}

impl DbConfig {
    /// Set the block size.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Set the number of buffer pool frames.
    pub fn with_buffer_pool_size(mut self, buffer_pool_size: usize) -> Self {
        self.buffer_pool_size = buffer_pool_size;
        self
    }

    /// Set the lock wait ceiling.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            buffer_pool_size: DEFAULT_BUFFER_POOL_SIZE,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}
