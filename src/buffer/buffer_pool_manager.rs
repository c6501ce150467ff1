//! Buffer Pool Manager - the block caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Block caching between disk and memory
//! - Pin-based reference counting
//! - Dirty page write-back on eviction and flush
//! - FIFO eviction of unpinned frames

use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::replacer::FifoReplacer;
use crate::buffer::{BufferPoolStats, Frame, PageReadGuard, PageWriteGuard};
use crate::common::{BlockId, Error, FrameId, Result, TransactionId};
use crate::storage::FileManager;

/// Bookkeeping that must change together when a frame is pinned, unpinned,
/// loaded or evicted.
struct PoolState {
    /// Maps resident blocks to their frames.
    page_table: HashMap<BlockId, FrameId>,
    /// Stack of free frame IDs (LIFO for cache locality).
    free_list: Vec<FrameId>,
    /// Eviction policy for selecting victim frames.
    replacer: FifoReplacer,
}

/// Manages a pool of buffer frames caching disk blocks.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌─────────────── state: Mutex ───────────────┐            │
/// │  │ page_table   free_list    replacer          │            │
/// │  │ BlockId→Fid  Vec<FrameId> FifoReplacer      │            │
/// │  └─────────────────────────────────────────────┘            │
/// │  ┌───────────────────────────────────┐  ┌──────────────┐   │
/// │  │        frames: Vec<Frame>         │  │ file_manager │   │
/// │  │  [Frame0] [Frame1] [Frame2] ...   │  │ Arc<FileMgr> │   │
/// │  └───────────────────────────────────┘  └──────────────┘   │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `state`: one `Mutex`; every pin, unpin, load and eviction runs under it,
///   so a frame can never be evicted between lookup and pin
/// - `frames`: fixed size, each Frame latches its page with an `RwLock`
/// - `file_manager`: internally synchronized
/// - `stats`: atomic counters
///
/// The state mutex is never held while waiting for the page latch of a
/// pinned frame. Guards unpin (and so take the state mutex) while still
/// latching their page.
pub struct BufferPoolManager {
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    file_manager: Arc<FileManager>,
    stats: BufferPoolStats,
    pool_size: usize,
}

impl BufferPoolManager {
    /// Create a new buffer pool manager.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, file_manager: Arc<FileManager>) -> Self {
        assert!(pool_size > 0, "pool_size must be > 0");

        let block_size = file_manager.block_size();
        let frames: Vec<Frame> = (0..pool_size).map(|_| Frame::new(block_size)).collect();
        let free_list: Vec<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                replacer: FifoReplacer::new(),
            }),
            file_manager,
            stats: BufferPoolStats::new(),
            pool_size,
        }
    }

    // ========================================================================
    // Public API: Guarded access
    // ========================================================================

    /// Fetch a block for reading.
    ///
    /// # Errors
    /// - `Error::BlockIo` if the block cannot be read from disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_read(&self, block: &BlockId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.pin(block)?;
        let lock = self.frames[frame_id.0].page();

        Ok(PageReadGuard::new(self, frame_id, block.clone(), lock))
    }

    /// Fetch a block for writing. The frame is marked dirty when the guard drops.
    ///
    /// # Errors
    /// - `Error::BlockIo` if the block cannot be read from disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn fetch_page_write(&self, block: &BlockId) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.pin(block)?;
        let lock = self.frames[frame_id.0].page_mut();

        Ok(PageWriteGuard::new(self, frame_id, block.clone(), lock))
    }

    /// Append a zeroed block to `filename` and load it into the pool.
    ///
    /// # Errors
    /// - `Error::NoFreeFrames` if all frames are pinned
    /// - I/O errors from the append
    pub fn new_page(&self, filename: &str) -> Result<PageWriteGuard<'_>> {
        let (frame_id, block) = {
            let mut state = self.state.lock();
            let frame_id = self.get_free_frame(&mut state)?;

            let block = match self.file_manager.append(filename) {
                Ok(block) => block,
                Err(e) => {
                    state.free_list.push(frame_id);
                    return Err(e);
                }
            };

            self.frames[frame_id.0].page_mut().reset();
            self.install(&mut state, frame_id, block.clone());
            (frame_id, block)
        };

        let lock = self.frames[frame_id.0].page_mut();
        Ok(PageWriteGuard::new(self, frame_id, block, lock))
    }

    // ========================================================================
    // Public API: Explicit pinning
    // ========================================================================

    /// Pin a block, loading it from disk if it is not resident.
    ///
    /// Every successful call must be matched by one [`unpin`](Self::unpin).
    ///
    /// # Errors
    /// - `Error::BlockIo` if the block cannot be read from disk
    /// - `Error::NoFreeFrames` if all frames are pinned
    pub fn pin(&self, block: &BlockId) -> Result<FrameId> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(block) {
            self.frames[frame_id.0].pin();
            state.replacer.record_access(frame_id);
            state.replacer.set_evictable(frame_id, false);
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(frame_id);
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.get_free_frame(&mut state)?;

        // The frame is unpinned and unmapped, so nobody else latches it.
        let read = {
            let mut page = self.frames[frame_id.0].page_mut();
            self.file_manager.read(block, &mut page)
        };
        if let Err(e) = read {
            state.free_list.push(frame_id);
            return Err(e);
        }
        self.stats.blocks_read.fetch_add(1, Ordering::Relaxed);

        self.install(&mut state, frame_id, block.clone());
        Ok(frame_id)
    }

    /// Release one pin on a frame, optionally marking it dirty first.
    pub fn unpin(&self, frame_id: FrameId, is_dirty: bool) {
        let frame = &self.frames[frame_id.0];
        if is_dirty {
            frame.mark_dirty();
        }

        let mut state = self.state.lock();
        if frame.unpin() == 0 {
            state.replacer.set_evictable(frame_id, true);
        }
    }

    /// Access a frame. The caller must hold a pin on it.
    #[inline]
    pub fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.0]
    }

    // ========================================================================
    // Public API: Delete and flush
    // ========================================================================

    /// Drop a block from the buffer pool without writing it back.
    ///
    /// # Errors
    /// Returns `Error::PagePinned` if the block is still pinned.
    pub fn delete_page(&self, block: &BlockId) -> Result<()> {
        let mut state = self.state.lock();

        let frame_id = match state.page_table.get(block) {
            Some(&fid) => fid,
            None => return Ok(()),
        };

        let frame = &self.frames[frame_id.0];
        if frame.is_pinned() {
            return Err(Error::PagePinned(block.clone()));
        }

        state.page_table.remove(block);
        state.replacer.remove(frame_id);
        state.free_list.push(frame_id);
        frame.assign(None);

        Ok(())
    }

    /// Write a block back to disk if it is resident and dirty.
    ///
    /// # Errors
    /// Returns I/O errors from the write.
    pub fn flush_page(&self, block: &BlockId) -> Result<()> {
        let frame_id = {
            let mut state = self.state.lock();
            match state.page_table.get(block) {
                Some(&fid) => {
                    self.frames[fid.0].pin();
                    state.replacer.set_evictable(fid, false);
                    fid
                }
                None => return Ok(()),
            }
        };

        let result = self.write_back(frame_id, block);
        self.unpin(frame_id, false);
        result
    }

    /// Write every dirty resident block back to disk.
    ///
    /// # Errors
    /// Returns the first I/O error encountered.
    pub fn flush_all_pages(&self) -> Result<()> {
        let blocks: Vec<BlockId> = {
            let state = self.state.lock();
            state.page_table.keys().cloned().collect()
        };

        for block in &blocks {
            self.flush_page(block)?;
        }

        Ok(())
    }

    /// Write back every resident block whose unflushed changes belong to `txn`.
    ///
    /// Blocks the transaction modified but that were evicted since have
    /// already been written by the eviction.
    ///
    /// # Errors
    /// Returns the first I/O error encountered.
    pub fn flush_modified_by(&self, txn: TransactionId) -> Result<()> {
        let blocks: Vec<BlockId> = {
            let state = self.state.lock();
            state
                .page_table
                .iter()
                .filter(|(_, frame_id)| self.frames[frame_id.0].modified_by() == Some(txn))
                .map(|(block, _)| block.clone())
                .collect()
        };

        for block in &blocks {
            self.flush_page(block)?;
        }
        if !blocks.is_empty() {
            debug!(%txn, flushed = blocks.len(), "flushed transaction's blocks");
        }

        Ok(())
    }

    /// Detach `txn` from every frame it modified, so that a later
    /// [`flush_modified_by`](Self::flush_modified_by) for it writes nothing.
    ///
    /// The pages stay dirty and are written back on eviction like any other.
    pub fn disown_modifications(&self, txn: TransactionId) {
        for frame in &self.frames {
            frame.disown(txn);
        }
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    /// Get buffer pool statistics.
    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Get the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of frames not currently pinned.
    pub fn available(&self) -> usize {
        let _state = self.state.lock();
        self.frames.iter().filter(|f| !f.is_pinned()).count()
    }

    /// Get the number of free (never used or deleted) frames.
    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Get the number of blocks resident in the pool.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    /// The file manager backing the pool.
    pub fn file_manager(&self) -> &Arc<FileManager> {
        &self.file_manager
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    /// Map `block` to `frame_id` and pin it once.
    fn install(&self, state: &mut PoolState, frame_id: FrameId, block: BlockId) {
        let frame = &self.frames[frame_id.0];
        frame.assign(Some(block.clone()));
        frame.pin();

        state.page_table.insert(block, frame_id);
        state.replacer.record_access(frame_id);
        state.replacer.set_evictable(frame_id, false);
    }

    /// Get a free frame, evicting if necessary.
    fn get_free_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop() {
            return Ok(frame_id);
        }

        self.evict(state)
    }

    /// Evict the replacer's victim, writing it back first if dirty.
    fn evict(&self, state: &mut PoolState) -> Result<FrameId> {
        let frame_id = state.replacer.evict().ok_or(Error::NoFreeFrames)?;
        let frame = &self.frames[frame_id.0];

        if let Some(old_block) = frame.block() {
            if let Err(e) = self.write_back(frame_id, &old_block) {
                // Leave the victim resident and evictable.
                state.replacer.record_access(frame_id);
                state.replacer.set_evictable(frame_id, true);
                return Err(e);
            }
            state.page_table.remove(&old_block);
            debug!(block = %old_block, frame = %frame_id, "evicted block");
        }

        frame.assign(None);
        self.stats.evictions.fetch_add(1, Ordering::Relaxed);
        Ok(frame_id)
    }

    /// Write a frame to `block` if it is dirty.
    fn write_back(&self, frame_id: FrameId, block: &BlockId) -> Result<()> {
        let frame = &self.frames[frame_id.0];
        let page = frame.page();

        if frame.is_dirty() {
            self.file_manager.write(block, &page)?;
            frame.mark_clean();
            self.stats.blocks_written.fetch_add(1, Ordering::Relaxed);
        }

        Ok(())
    }
}
