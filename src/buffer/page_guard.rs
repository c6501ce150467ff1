//! RAII guards for page access.
//!
//! These guards provide scoped access to pages in the buffer pool:
//! - [`PageReadGuard`] - Shared read access (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write access (auto-marks dirty)
//!
//! Both guards unpin their frame when dropped. They latch the page only; a
//! transaction must still hold the matching block lock before using them.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{BlockId, FrameId};
use crate::storage::page::Page;

use super::buffer_pool_manager::BufferPoolManager;

/// Guard for read-only page access.
///
/// # Example
/// ```ignore
/// let guard = bpm.fetch_page_read(&block)?;
/// let n = guard.get_int(0);  // Deref to &Page
/// // guard drops here, frame unpinned
/// ```
pub struct PageReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    block: BlockId,
    lock: RwLockReadGuard<'a, Page>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        block: BlockId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            block,
            lock,
        }
    }

    /// The block this page mirrors.
    #[inline]
    pub fn block(&self) -> &BlockId {
        &self.block
    }

    /// The frame holding the page.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.bpm.unpin(self.frame_id, false);
    }
}

/// Guard for exclusive write access to a page.
///
/// The frame is marked dirty and unpinned when the guard drops.
///
/// # Example
/// ```ignore
/// let mut guard = bpm.fetch_page_write(&block)?;
/// guard.set_int(0, 42);  // DerefMut to &mut Page
/// // guard drops here, frame marked dirty and unpinned
/// ```
pub struct PageWriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    block: BlockId,
    lock: RwLockWriteGuard<'a, Page>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(
        bpm: &'a BufferPoolManager,
        frame_id: FrameId,
        block: BlockId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            bpm,
            frame_id,
            block,
            lock,
        }
    }

    /// The block this page mirrors.
    #[inline]
    pub fn block(&self) -> &BlockId {
        &self.block
    }

    /// The frame holding the page.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Page {
        &mut self.lock
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        // Marked dirty while the page latch is still held.
        self.bpm.unpin(self.frame_id, true);
    }
}
