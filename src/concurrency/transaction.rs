//! Transaction - a unit of work over locked, pinned blocks.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::buffer::BufferPoolManager;
use crate::common::{BlockId, Error, FrameId, Result, TransactionId};
use crate::storage::page::Page;

use super::{ConcurrencyManager, LockTable};

/// Block number standing for "the end of a file".
///
/// Locking it serializes appends against size queries on the same file, so
/// a transaction that reads a file's size never sees it grow before commit.
const END_OF_FILE: u64 = u64::MAX;

/// A pin held by the transaction: the frame and how many times it was pinned.
struct Pin {
    frame_id: FrameId,
    count: usize,
}

/// A transaction.
///
/// Every access follows the same order: lock the block through the
/// transaction's [`ConcurrencyManager`], then read or write the pinned page
/// in the buffer pool. Locks and pins are given up together by
/// [`commit`](Self::commit) or [`rollback`](Self::rollback), which consume
/// the transaction so neither can run twice. Dropping an unfinished
/// transaction rolls it back.
///
/// Undo logging and recovery are not performed here; rollback releases
/// locks and pins only.
///
/// # Example
/// ```no_run
/// use blocklock::{Database, DbConfig};
///
/// let db = Database::open("mydb", DbConfig::default())?;
/// let mut tx = db.new_transaction();
/// let block = tx.append("accounts.tbl")?;
/// tx.pin(&block)?;
/// tx.set_int(&block, 0, 100)?;
/// tx.commit()?;
/// # Ok::<(), blocklock::Error>(())
/// ```
pub struct Transaction {
    id: TransactionId,
    concurrency: ConcurrencyManager,
    buffer_pool: Arc<BufferPoolManager>,
    pins: HashMap<BlockId, Pin>,
    finished: bool,
}

impl Transaction {
    /// Start a transaction over the database's shared lock table and pool.
    pub fn new(
        id: TransactionId,
        lock_table: Arc<LockTable>,
        buffer_pool: Arc<BufferPoolManager>,
    ) -> Self {
        debug!(txn = %id, "transaction started");
        Self {
            id,
            concurrency: ConcurrencyManager::new(lock_table),
            buffer_pool,
            pins: HashMap::new(),
            finished: false,
        }
    }

    /// This transaction's id.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Pin a block so its page stays in the buffer pool.
    ///
    /// # Errors
    /// Returns buffer pool errors (`NoFreeFrames`, `BlockIo`).
    pub fn pin(&mut self, block: &BlockId) -> Result<()> {
        let frame_id = self.buffer_pool.pin(block)?;
        self.pins
            .entry(block.clone())
            .or_insert(Pin { frame_id, count: 0 })
            .count += 1;
        Ok(())
    }

    /// Release one pin on a block.
    ///
    /// # Errors
    /// Returns `Error::BlockNotPinned` if the block is not pinned.
    pub fn unpin(&mut self, block: &BlockId) -> Result<()> {
        let pin = self
            .pins
            .get_mut(block)
            .ok_or_else(|| Error::BlockNotPinned(block.clone()))?;

        self.buffer_pool.unpin(pin.frame_id, false);
        pin.count -= 1;
        if pin.count == 0 {
            self.pins.remove(block);
        }
        Ok(())
    }

    /// Read an integer from a pinned block under a shared lock.
    ///
    /// # Errors
    /// - `Error::BlockNotPinned` if the block is not pinned
    /// - `Error::LockAbort` if the shared lock times out
    pub fn get_int(&mut self, block: &BlockId, offset: usize) -> Result<i32> {
        let frame_id = self.frame_of(block)?;
        self.concurrency.slock(block)?;

        Ok(self.buffer_pool.frame(frame_id).page().get_int(offset))
    }

    /// Read a string from a pinned block under a shared lock.
    ///
    /// # Errors
    /// As [`get_int`](Self::get_int), plus `Error::InvalidString`.
    pub fn get_string(&mut self, block: &BlockId, offset: usize) -> Result<String> {
        let frame_id = self.frame_of(block)?;
        self.concurrency.slock(block)?;

        self.buffer_pool.frame(frame_id).page().get_string(offset)
    }

    /// Write an integer to a pinned block under an exclusive lock.
    ///
    /// # Errors
    /// - `Error::BlockNotPinned` if the block is not pinned
    /// - `Error::LockAbort` if the exclusive lock times out
    pub fn set_int(&mut self, block: &BlockId, offset: usize, value: i32) -> Result<()> {
        self.modify(block, |page| page.set_int(offset, value))
    }

    /// Write a string to a pinned block under an exclusive lock.
    ///
    /// # Errors
    /// As [`set_int`](Self::set_int).
    pub fn set_string(&mut self, block: &BlockId, offset: usize, value: &str) -> Result<()> {
        self.modify(block, |page| page.set_string(offset, value))
    }

    /// Number of blocks in a file.
    ///
    /// # Errors
    /// Returns `Error::LockAbort` if another transaction is appending to the
    /// file, or I/O errors.
    pub fn size(&mut self, filename: &str) -> Result<u64> {
        self.concurrency.slock(&BlockId::new(filename, END_OF_FILE))?;
        self.buffer_pool.file_manager().length(filename)
    }

    /// Append a zeroed block to a file.
    ///
    /// # Errors
    /// Returns `Error::LockAbort` if another transaction has read the file's
    /// size or is appending to it, or I/O errors.
    pub fn append(&mut self, filename: &str) -> Result<BlockId> {
        self.concurrency.xlock(&BlockId::new(filename, END_OF_FILE))?;
        self.buffer_pool.file_manager().append(filename)
    }

    /// Bytes per block.
    pub fn block_size(&self) -> usize {
        self.buffer_pool.file_manager().block_size()
    }

    /// Number of unpinned frames in the buffer pool.
    pub fn available_buffers(&self) -> usize {
        self.buffer_pool.available()
    }

    /// Flush this transaction's writes, then release its locks and pins.
    ///
    /// # Errors
    /// Returns the first I/O error from flushing; the transaction is then
    /// rolled back when dropped.
    pub fn commit(mut self) -> Result<()> {
        self.buffer_pool.flush_modified_by(self.id)?;
        self.finish();

        debug!(txn = %self.id, "transaction committed");
        Ok(())
    }

    /// Release this transaction's locks and pins without flushing.
    pub fn rollback(mut self) {
        self.finish();
        debug!(txn = %self.id, "transaction rolled back");
    }

    fn modify<F>(&mut self, block: &BlockId, write: F) -> Result<()>
    where
        F: FnOnce(&mut Page),
    {
        let frame_id = self.frame_of(block)?;
        self.concurrency.xlock(block)?;

        let frame = self.buffer_pool.frame(frame_id);
        {
            let mut page = frame.page_mut();
            write(&mut *page);
            frame.set_modified(self.id);
        }
        Ok(())
    }

    fn frame_of(&self, block: &BlockId) -> Result<FrameId> {
        self.pins
            .get(block)
            .map(|pin| pin.frame_id)
            .ok_or_else(|| Error::BlockNotPinned(block.clone()))
    }

    fn finish(&mut self) {
        self.buffer_pool.disown_modifications(self.id);
        self.concurrency.release();
        for (_, pin) in self.pins.drain() {
            for _ in 0..pin.count {
                self.buffer_pool.unpin(pin.frame_id, false);
            }
        }
        self.finished = true;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            warn!(txn = %self.id, "transaction dropped while active, rolling back");
            self.finish();
        }
    }
}
