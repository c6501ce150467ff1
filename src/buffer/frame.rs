//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] pairs a [`Page`] with the block it currently mirrors, a pin
//! count, and a record of unflushed modifications.

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{BlockId, TransactionId};
use crate::storage::page::Page;

/// Which block a frame holds and whether its page differs from disk.
#[derive(Debug, Default)]
struct Contents {
    block: Option<BlockId>,
    dirty: bool,
    /// Last transaction to write the page since it was last flushed.
    modified_by: Option<TransactionId>,
}

/// A frame in the buffer pool.
///
/// The pool allocates its frames once, each with a page of the configured
/// block size, and reassigns them to blocks as they are loaded and evicted.
///
/// # Thread Safety
/// The page sits behind an `RwLock` latch. Block assignment and the dirty
/// record share one small `Mutex`. The pin count is atomic, but it only
/// changes under the buffer pool's state mutex, so a frame is never evicted
/// between being looked up and being pinned.
pub struct Frame {
    page: RwLock<Page>,
    contents: Mutex<Contents>,
    pins: AtomicU32,
}

impl Frame {
    /// An unassigned frame holding a zeroed page.
    pub fn new(block_size: usize) -> Self {
        Self {
            page: RwLock::new(Page::new(block_size)),
            contents: Mutex::new(Contents::default()),
            pins: AtomicU32::new(0),
        }
    }

    /// Latch the page for reading.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Latch the page for writing.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    /// The block currently held, if any.
    pub fn block(&self) -> Option<BlockId> {
        self.contents.lock().block.clone()
    }

    /// Assign the frame to a block (or to none), starting clean.
    pub fn assign(&self, block: Option<BlockId>) {
        *self.contents.lock() = Contents {
            block,
            ..Contents::default()
        };
    }

    /// Add a pin. Returns the new pin count.
    #[inline]
    pub fn pin(&self) -> u32 {
        self.pins.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Remove a pin. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if the frame is not pinned.
    #[inline]
    pub fn unpin(&self) -> u32 {
        let previous = self.pins.fetch_sub(1, Ordering::Relaxed);
        assert!(previous > 0, "unpinned a frame with no pins");
        previous - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pins.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    /// Record a write that no transaction claims (page guard access).
    pub fn mark_dirty(&self) {
        self.contents.lock().dirty = true;
    }

    /// Record a write made by `txn`.
    pub fn set_modified(&self, txn: TransactionId) {
        let mut contents = self.contents.lock();
        contents.dirty = true;
        contents.modified_by = Some(txn);
    }

    /// The transaction whose write is still unflushed, if any.
    pub fn modified_by(&self) -> Option<TransactionId> {
        self.contents.lock().modified_by
    }

    /// Stop attributing the page's changes to `txn`. The page stays dirty.
    pub fn disown(&self, txn: TransactionId) {
        let mut contents = self.contents.lock();
        if contents.modified_by == Some(txn) {
            contents.modified_by = None;
        }
    }

    /// Forget pending modifications once the page matches disk.
    pub fn mark_clean(&self) {
        let mut contents = self.contents.lock();
        contents.dirty = false;
        contents.modified_by = None;
    }

    /// Whether the page must be written back before reuse.
    pub fn is_dirty(&self) -> bool {
        self.contents.lock().dirty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_is_unassigned() {
        let frame = Frame::new(128);
        assert_eq!(frame.block(), None);
        assert_eq!(frame.pin_count(), 0);
        assert!(!frame.is_dirty());
        assert_eq!(frame.page().len(), 128);
    }

    #[test]
    fn test_pins_are_counted() {
        let frame = Frame::new(64);

        frame.pin();
        assert_eq!(frame.pin(), 2);
        assert_eq!(frame.unpin(), 1);
        assert!(frame.is_pinned());
        frame.unpin();
        assert!(!frame.is_pinned());
    }

    #[test]
    #[should_panic(expected = "no pins")]
    fn test_unpin_without_pin_panics() {
        Frame::new(64).unpin();
    }

    #[test]
    fn test_modification_record() {
        let frame = Frame::new(64);
        frame.assign(Some(BlockId::new("t", 4)));

        frame.set_modified(TransactionId::new(3));
        assert!(frame.is_dirty());
        assert_eq!(frame.modified_by(), Some(TransactionId::new(3)));

        frame.mark_clean();
        assert!(!frame.is_dirty());
        assert_eq!(frame.modified_by(), None);

        frame.mark_dirty();
        assert!(frame.is_dirty());
        assert_eq!(frame.modified_by(), None);
    }

    #[test]
    fn test_disown_only_matching_transaction() {
        let frame = Frame::new(64);
        frame.set_modified(TransactionId::new(5));

        frame.disown(TransactionId::new(6));
        assert_eq!(frame.modified_by(), Some(TransactionId::new(5)));

        frame.disown(TransactionId::new(5));
        assert_eq!(frame.modified_by(), None);
        assert!(frame.is_dirty());
    }

    #[test]
    fn test_assign_starts_clean() {
        let frame = Frame::new(64);
        frame.set_modified(TransactionId::new(1));

        frame.assign(Some(BlockId::new("t", 2)));
        assert_eq!(frame.block(), Some(BlockId::new("t", 2)));
        assert!(!frame.is_dirty());

        frame.assign(None);
        assert_eq!(frame.block(), None);
    }

    #[test]
    fn test_page_latch() {
        let frame = Frame::new(64);

        frame.page_mut().set_int(8, 1234);
        assert_eq!(frame.page().get_int(8), 1234);
    }
}
