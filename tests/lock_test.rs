//! Multi-threaded tests of the lock table and concurrency manager.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use blocklock::{BlockId, ConcurrencyManager, Error, LockState, LockTable, Result};

const SHORT_WAIT: Duration = Duration::from_millis(100);
const LONG_WAIT: Duration = Duration::from_secs(5);

fn block(n: u64) -> BlockId {
    BlockId::new("t", n)
}

/// Shared locks from many transactions are granted at the same time.
#[test]
fn test_shared_locks_are_compatible() {
    common::init_tracing();
    const READERS: u32 = 4;

    let table = Arc::new(LockTable::new(SHORT_WAIT));
    let checked = Arc::new(Barrier::new(READERS as usize + 1));

    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let table = Arc::clone(&table);
            let checked = Arc::clone(&checked);
            thread::spawn(move || {
                let mut cm = ConcurrencyManager::new(table);
                cm.slock(&block(1)).unwrap();
                checked.wait();
                cm.release();
            })
        })
        .collect();

    let deadline = Instant::now() + LONG_WAIT;
    while table.lock_state(&block(1)) != Some(LockState::Shared(READERS)) {
        assert!(Instant::now() < deadline, "readers never all held the lock");
        thread::sleep(Duration::from_millis(5));
    }
    checked.wait();

    for h in handles {
        h.join().unwrap();
    }
    assert_eq!(table.lock_state(&block(1)), None);
}

/// While one transaction holds X, nobody else gets S or X.
#[test]
fn test_exclusive_excludes_everyone() {
    let table = Arc::new(LockTable::new(SHORT_WAIT));
    let mut writer = ConcurrencyManager::new(Arc::clone(&table));
    writer.xlock(&block(1)).unwrap();

    let results: Vec<_> = thread::scope(|s| {
        let reader = s.spawn(|| {
            let mut cm = ConcurrencyManager::new(Arc::clone(&table));
            cm.slock(&block(1))
        });
        let other_writer = s.spawn(|| {
            let mut cm = ConcurrencyManager::new(Arc::clone(&table));
            cm.xlock(&block(1))
        });
        vec![reader.join().unwrap(), other_writer.join().unwrap()]
    });

    for result in results {
        assert!(matches!(result, Err(Error::LockAbort(ref b)) if b == &block(1)));
    }
    assert_eq!(table.lock_state(&block(1)), Some(LockState::Exclusive));
}

/// A writer behind two readers stays blocked until both have released.
#[test]
fn test_writer_waits_for_every_reader() {
    let table = Arc::new(LockTable::new(LONG_WAIT));
    let mut first = ConcurrencyManager::new(Arc::clone(&table));
    let mut second = ConcurrencyManager::new(Arc::clone(&table));
    first.slock(&block(1)).unwrap();
    second.slock(&block(1)).unwrap();

    let granted = Arc::new(AtomicBool::new(false));
    let writer = {
        let table = Arc::clone(&table);
        let granted = Arc::clone(&granted);
        thread::spawn(move || {
            let mut cm = ConcurrencyManager::new(table);
            cm.xlock(&block(1)).unwrap();
            granted.store(true, Ordering::SeqCst);
            cm.release();
        })
    };

    thread::sleep(Duration::from_millis(50));
    first.release();
    thread::sleep(Duration::from_millis(100));

    // The writer's own shared lock plus the second reader's.
    assert!(!granted.load(Ordering::SeqCst));
    assert_eq!(table.lock_state(&block(1)), Some(LockState::Shared(2)));

    second.release();
    writer.join().unwrap();
    assert!(granted.load(Ordering::SeqCst));
    assert_eq!(table.lock_state(&block(1)), None);
}

/// Run `request` on another transaction while this one holds X, and check it
/// is granted only after X is released.
type LockRequest = fn(&mut ConcurrencyManager, &BlockId) -> Result<()>;

fn assert_granted_after_exclusive_release(request: LockRequest) {
    let table = Arc::new(LockTable::new(LONG_WAIT));
    let mut holder = ConcurrencyManager::new(Arc::clone(&table));
    holder.xlock(&block(1)).unwrap();

    let granted = Arc::new(AtomicBool::new(false));
    let waiter = {
        let table = Arc::clone(&table);
        let granted = Arc::clone(&granted);
        thread::spawn(move || {
            let mut cm = ConcurrencyManager::new(table);
            let result = request(&mut cm, &block(1));
            granted.store(true, Ordering::SeqCst);
            let state = cm.mode(&block(1));
            cm.release();
            result.map(|_| state)
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(!granted.load(Ordering::SeqCst));
    assert_eq!(table.lock_state(&block(1)), Some(LockState::Exclusive));

    holder.release();
    let mode = waiter.join().unwrap().unwrap();
    assert!(mode.is_some());
    assert_eq!(table.lock_state(&block(1)), None);
}

#[test]
fn test_shared_request_granted_after_exclusive_release() {
    assert_granted_after_exclusive_release(ConcurrencyManager::slock);
}

#[test]
fn test_exclusive_request_granted_after_exclusive_release() {
    assert_granted_after_exclusive_release(ConcurrencyManager::xlock);
}

/// An exclusive request waits for a reader and is granted once it leaves.
#[test]
fn test_writer_waits_for_reader() {
    let table = Arc::new(LockTable::new(LONG_WAIT));
    let mut reader = ConcurrencyManager::new(Arc::clone(&table));
    reader.slock(&block(1)).unwrap();

    let writer = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            let mut cm = ConcurrencyManager::new(table);
            let start = Instant::now();
            cm.xlock(&block(1)).unwrap();
            let waited = start.elapsed();
            assert!(cm.has_xlock(&block(1)));
            cm.release();
            waited
        })
    };

    thread::sleep(Duration::from_millis(50));
    reader.release();

    let waited = writer.join().unwrap();
    assert!(waited >= Duration::from_millis(40));
    assert!(waited < LONG_WAIT);
}

/// Repeated S and X requests after X is held change nothing.
#[test]
fn test_upgrade_idempotence() {
    let table = Arc::new(LockTable::new(SHORT_WAIT));
    let mut cm = ConcurrencyManager::new(Arc::clone(&table));

    cm.slock(&block(1)).unwrap();
    cm.slock(&block(1)).unwrap();
    assert_eq!(table.lock_state(&block(1)), Some(LockState::Shared(1)));

    cm.xlock(&block(1)).unwrap();
    cm.xlock(&block(1)).unwrap();
    cm.slock(&block(1)).unwrap();
    assert_eq!(table.lock_state(&block(1)), Some(LockState::Exclusive));
    assert_eq!(cm.held_count(), 1);

    cm.release();
    assert_eq!(table.lock_state(&block(1)), None);
}

/// A request that cannot be granted aborts once the ceiling passes.
#[test]
fn test_timeout_abort() {
    let table = Arc::new(LockTable::new(SHORT_WAIT));
    let mut reader = ConcurrencyManager::new(Arc::clone(&table));
    reader.slock(&block(1)).unwrap();

    let start = Instant::now();
    let result = thread::scope(|s| {
        s.spawn(|| {
            let mut cm = ConcurrencyManager::new(Arc::clone(&table));
            let result = cm.xlock(&block(1));
            // The shared lock taken on the way up is still recorded.
            assert_eq!(cm.held_count(), 1);
            cm.release();
            result
        })
        .join()
        .unwrap()
    });

    assert!(matches!(result, Err(Error::LockAbort(_))));
    assert!(start.elapsed() >= SHORT_WAIT);
    assert_eq!(table.lock_state(&block(1)), Some(LockState::Shared(1)));
}

/// After release, every block the transaction held is free again.
#[test]
fn test_release_all() {
    let table = Arc::new(LockTable::new(SHORT_WAIT));
    let mut cm = ConcurrencyManager::new(Arc::clone(&table));

    for n in 0..5 {
        cm.slock(&block(n)).unwrap();
    }
    for n in 5..10 {
        cm.xlock(&block(n)).unwrap();
    }
    assert_eq!(cm.held_count(), 10);

    cm.release();
    assert_eq!(cm.held_count(), 0);
    for n in 0..10 {
        assert_eq!(table.lock_state(&block(n)), None);
    }

    // Another transaction can take X on all of them without waiting.
    let mut other = ConcurrencyManager::new(Arc::clone(&table));
    for n in 0..10 {
        other.xlock(&block(n)).unwrap();
    }
    other.release();
    cm.release();
}
