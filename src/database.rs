//! Database - wiring of the shared services.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::buffer::BufferPoolManager;
use crate::common::config::DbConfig;
use crate::common::{Result, TransactionId};
use crate::concurrency::{LockTable, Transaction};
use crate::storage::FileManager;

/// An open database directory.
///
/// Owns the one [`FileManager`], [`LockTable`] and [`BufferPoolManager`] of
/// the process and hands them to every transaction it creates.
///
/// # Example
/// ```no_run
/// use blocklock::{Database, DbConfig};
///
/// let db = Database::open("mydb", DbConfig::default())?;
/// if db.is_new() {
///     // format catalog files
/// }
/// let tx = db.new_transaction();
/// tx.commit()?;
/// # Ok::<(), blocklock::Error>(())
/// ```
pub struct Database {
    file_manager: Arc<FileManager>,
    lock_table: Arc<LockTable>,
    buffer_pool: Arc<BufferPoolManager>,
    next_txn: AtomicU64,
}

impl Database {
    /// Open (or create) the database at `dir`.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn open<P: AsRef<Path>>(dir: P, config: DbConfig) -> Result<Self> {
        let file_manager = Arc::new(FileManager::new(dir, config.block_size)?);
        let lock_table = Arc::new(LockTable::new(config.lock_timeout));
        let buffer_pool = Arc::new(BufferPoolManager::new(
            config.buffer_pool_size,
            Arc::clone(&file_manager),
        ));

        info!(
            buffer_pool_size = config.buffer_pool_size,
            lock_timeout_ms = config.lock_timeout.as_millis() as u64,
            "database ready"
        );

        Ok(Self {
            file_manager,
            lock_table,
            buffer_pool,
            next_txn: AtomicU64::new(1),
        })
    }

    /// Begin a new transaction.
    pub fn new_transaction(&self) -> Transaction {
        let id = TransactionId::new(self.next_txn.fetch_add(1, Ordering::Relaxed));
        Transaction::new(
            id,
            Arc::clone(&self.lock_table),
            Arc::clone(&self.buffer_pool),
        )
    }

    /// Whether the directory was created by this open.
    pub fn is_new(&self) -> bool {
        self.file_manager.is_new()
    }

    /// The block storage manager.
    pub fn file_manager(&self) -> &Arc<FileManager> {
        &self.file_manager
    }

    /// The shared lock table.
    pub fn lock_table(&self) -> &Arc<LockTable> {
        &self.lock_table
    }

    /// The buffer pool.
    pub fn buffer_pool(&self) -> &Arc<BufferPoolManager> {
        &self.buffer_pool
    }
}
