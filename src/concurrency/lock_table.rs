//! Lock Table - process-wide block locks with bounded waiting.
//!
//! The [`LockTable`] grants shared and exclusive locks on blocks. It records
//! only how a block is locked, not by whom; each transaction's
//! [`ConcurrencyManager`](super::ConcurrencyManager) tracks its own locks.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::common::config::DEFAULT_LOCK_TIMEOUT;
use crate::common::{BlockId, Error, Result};

type LockMap<'a> = MutexGuard<'a, HashMap<BlockId, LockState>>;

/// How a block is currently locked.
///
/// A block with no entry in the table is unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// One writer holds the block.
    Exclusive,
    /// `n ≥ 1` readers hold the block.
    Shared(u32),
}

/// Shared lock table for all transactions of a database.
///
/// # Compatibility
/// ```text
///              held: none   Shared(n)        Exclusive
/// request S:   grant        grant            wait
/// request X:   grant        wait if n > 1    wait
/// ```
///
/// An exclusive request is expected to come from a transaction that already
/// holds a shared lock on the block, so one shared holder (the requester
/// itself) does not block it.
///
/// # Waiting
/// Blocked requests sleep on a condition variable that every `unlock`
/// broadcasts to. A request still unsatisfied after `max_wait` fails with
/// `Error::LockAbort`; there is no deadlock detection beyond that timeout.
/// Waiters are not queued, so a new shared request may overtake a waiting
/// exclusive one.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use blocklock::{BlockId, LockTable};
///
/// let table = LockTable::new(Duration::from_millis(50));
/// let block = BlockId::new("t", 0);
///
/// table.slock(&block).unwrap();
/// table.slock(&block).unwrap();
/// table.unlock(&block);
/// table.xlock(&block).unwrap(); // the remaining shared lock is the caller's
/// table.unlock(&block);
/// assert_eq!(table.lock_state(&block), None);
/// ```
#[derive(Debug)]
pub struct LockTable {
    locks: Mutex<HashMap<BlockId, LockState>>,
    released: Condvar,
    max_wait: Duration,
}

impl LockTable {
    /// Create a lock table whose requests give up after `max_wait`.
    pub fn new(max_wait: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            released: Condvar::new(),
            max_wait,
        }
    }

    /// Acquire a shared lock, waiting while the block is exclusively held.
    ///
    /// # Errors
    /// Returns `Error::LockAbort` if the block stays exclusively locked for
    /// longer than the wait ceiling.
    pub fn slock(&self, block: &BlockId) -> Result<()> {
        let mut locks = self.wait_while(block, |state| state == Some(LockState::Exclusive))?;

        let state = match locks.get(block) {
            Some(LockState::Shared(n)) => LockState::Shared(n + 1),
            _ => LockState::Shared(1),
        };
        locks.insert(block.clone(), state);

        debug!(%block, ?state, "granted shared lock");
        Ok(())
    }

    /// Acquire an exclusive lock, waiting while any other transaction holds
    /// the block.
    ///
    /// # Errors
    /// Returns `Error::LockAbort` if the block is not released by other
    /// holders within the wait ceiling.
    pub fn xlock(&self, block: &BlockId) -> Result<()> {
        let mut locks = self.wait_while(block, |state| match state {
            Some(LockState::Exclusive) => true,
            Some(LockState::Shared(n)) => n > 1,
            None => false,
        })?;

        locks.insert(block.clone(), LockState::Exclusive);

        debug!(%block, "granted exclusive lock");
        Ok(())
    }

    /// Release one lock on a block and wake every waiter.
    ///
    /// Unlocking a block that is not locked does nothing.
    pub fn unlock(&self, block: &BlockId) {
        let mut locks = self.locks.lock();

        match locks.get(block).copied() {
            Some(LockState::Shared(n)) if n > 1 => {
                locks.insert(block.clone(), LockState::Shared(n - 1));
            }
            Some(_) => {
                locks.remove(block);
            }
            None => return,
        }
        drop(locks);

        debug!(%block, "released lock");
        self.released.notify_all();
    }

    /// Current state of a block, or `None` if it is unlocked.
    pub fn lock_state(&self, block: &BlockId) -> Option<LockState> {
        self.locks.lock().get(block).copied()
    }

    /// The configured wait ceiling.
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Wait until `blocked` is false for the block's state, or the ceiling passes.
    ///
    /// Returns the table guard so the caller can grant atomically.
    fn wait_while<F>(&self, block: &BlockId, blocked: F) -> Result<LockMap<'_>>
    where
        F: Fn(Option<LockState>) -> bool,
    {
        let deadline = Instant::now() + self.max_wait;
        let mut locks = self.locks.lock();

        while blocked(locks.get(block).copied()) {
            if self.released.wait_until(&mut locks, deadline).timed_out()
                && blocked(locks.get(block).copied())
            {
                warn!(
                    %block,
                    state = ?locks.get(block),
                    waited_ms = self.max_wait.as_millis() as u64,
                    "lock request timed out"
                );
                return Err(Error::LockAbort(block.clone()));
            }
        }

        Ok(locks)
    }
}

impl Default for LockTable {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn table(wait_ms: u64) -> LockTable {
        LockTable::new(Duration::from_millis(wait_ms))
    }

    #[test]
    fn test_shared_locks_count_holders() {
        let table = table(50);
        let block = BlockId::new("t", 0);

        table.slock(&block).unwrap();
        table.slock(&block).unwrap();
        assert_eq!(table.lock_state(&block), Some(LockState::Shared(2)));

        table.unlock(&block);
        assert_eq!(table.lock_state(&block), Some(LockState::Shared(1)));

        table.unlock(&block);
        assert_eq!(table.lock_state(&block), None);
    }

    #[test]
    fn test_xlock_on_unlocked_block() {
        let table = table(50);
        let block = BlockId::new("t", 0);

        table.xlock(&block).unwrap();
        assert_eq!(table.lock_state(&block), Some(LockState::Exclusive));

        table.unlock(&block);
        assert_eq!(table.lock_state(&block), None);
    }

    #[test]
    fn test_xlock_upgrades_sole_shared_holder() {
        let table = table(50);
        let block = BlockId::new("t", 0);

        table.slock(&block).unwrap();
        table.xlock(&block).unwrap();
        assert_eq!(table.lock_state(&block), Some(LockState::Exclusive));
    }

    #[test]
    fn test_slock_times_out_on_exclusive() {
        let table = table(30);
        let block = BlockId::new("t", 0);
        table.xlock(&block).unwrap();

        let start = Instant::now();
        match table.slock(&block) {
            Err(Error::LockAbort(b)) => assert_eq!(b, block),
            other => panic!("expected LockAbort, got {:?}", other),
        }
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert_eq!(table.lock_state(&block), Some(LockState::Exclusive));
    }

    #[test]
    fn test_xlock_times_out_on_other_readers() {
        let table = table(30);
        let block = BlockId::new("t", 0);
        table.slock(&block).unwrap();
        table.slock(&block).unwrap();

        assert!(matches!(table.xlock(&block), Err(Error::LockAbort(_))));
        assert_eq!(table.lock_state(&block), Some(LockState::Shared(2)));
    }

    #[test]
    fn test_unlock_of_unlocked_block_is_noop() {
        let table = table(30);
        table.unlock(&BlockId::new("t", 0));
        assert_eq!(table.lock_state(&BlockId::new("t", 0)), None);
    }

    #[test]
    fn test_unlock_wakes_waiter() {
        let table = Arc::new(table(5_000));
        let block = BlockId::new("t", 0);
        table.xlock(&block).unwrap();

        let waiter = {
            let table = Arc::clone(&table);
            let block = block.clone();
            thread::spawn(move || table.slock(&block))
        };

        thread::sleep(Duration::from_millis(50));
        table.unlock(&block);

        waiter.join().unwrap().unwrap();
        assert_eq!(table.lock_state(&block), Some(LockState::Shared(1)));
    }

    #[test]
    fn test_blocks_are_independent() {
        let table = table(30);
        table.xlock(&BlockId::new("t", 0)).unwrap();

        table.slock(&BlockId::new("t", 1)).unwrap();
        table.xlock(&BlockId::new("u", 0)).unwrap();
    }
}
