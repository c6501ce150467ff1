//! Concurrency Manager - one transaction's view of its block locks.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::{BlockId, Result};

use super::LockTable;

/// Lock mode a transaction holds on a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Tracks the locks held by a single transaction.
///
/// The local record only short-circuits repeated requests; the shared
/// [`LockTable`] decides whether a lock is granted. Locks are acquired as
/// needed and released together by [`release`](Self::release) at commit or
/// rollback (strict two-phase locking).
///
/// An exclusive lock is always obtained by first taking a shared lock and
/// then upgrading, so a first write to a block costs two lock table calls.
pub struct ConcurrencyManager {
    lock_table: Arc<LockTable>,
    locks: HashMap<BlockId, LockMode>,
}

impl ConcurrencyManager {
    /// Create a manager with no locks, backed by the database's lock table.
    pub fn new(lock_table: Arc<LockTable>) -> Self {
        Self {
            lock_table,
            locks: HashMap::new(),
        }
    }

    /// Obtain a shared lock unless any lock on the block is already held.
    ///
    /// # Errors
    /// Returns `Error::LockAbort` if the lock table times out.
    pub fn slock(&mut self, block: &BlockId) -> Result<()> {
        if !self.locks.contains_key(block) {
            self.lock_table.slock(block)?;
            self.locks.insert(block.clone(), LockMode::Shared);
        }
        Ok(())
    }

    /// Obtain an exclusive lock unless it is already held.
    ///
    /// # Errors
    /// Returns `Error::LockAbort` if either the shared or the exclusive
    /// request times out. A shared lock obtained on the way stays recorded
    /// and is released with the others.
    pub fn xlock(&mut self, block: &BlockId) -> Result<()> {
        if !self.has_xlock(block) {
            self.slock(block)?;
            self.lock_table.xlock(block)?;
            self.locks.insert(block.clone(), LockMode::Exclusive);
        }
        Ok(())
    }

    /// Whether this transaction holds an exclusive lock on the block.
    pub fn has_xlock(&self, block: &BlockId) -> bool {
        self.locks.get(block) == Some(&LockMode::Exclusive)
    }

    /// The mode held on a block, if any.
    pub fn mode(&self, block: &BlockId) -> Option<LockMode> {
        self.locks.get(block).copied()
    }

    /// Number of blocks this transaction has locked.
    pub fn held_count(&self) -> usize {
        self.locks.len()
    }

    /// Release every lock this transaction holds.
    ///
    /// Calling it again afterwards does nothing.
    pub fn release(&mut self) {
        for block in self.locks.keys() {
            self.lock_table.unlock(block);
        }
        self.locks.clear();
    }
}
