//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;
use std::time::Duration;

use blocklock::{Database, DbConfig};
use tempfile::TempDir;

pub const BLOCK_SIZE: usize = 400;

static TRACING: Once = Once::new();

/// Install a test subscriber once. Filter with `RUST_LOG`, e.g.
/// `RUST_LOG=blocklock=debug cargo test`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Open a fresh database in a temporary directory.
pub fn open_db(pool_size: usize, lock_timeout: Duration) -> (Database, TempDir) {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = DbConfig::default()
        .with_block_size(BLOCK_SIZE)
        .with_buffer_pool_size(pool_size)
        .with_lock_timeout(lock_timeout);
    (Database::open(dir.path(), config).unwrap(), dir)
}
