//! File Manager - block-level file I/O for the database directory.
//!
//! The [`FileManager`] handles all direct file operations:
//! - Reading and writing whole blocks
//! - Appending new zeroed blocks
//! - Caching one open handle per file

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::common::{BlockId, Error, Result};
use crate::storage::page::Page;

/// Maps block addresses onto the files of a database directory.
///
/// # Directory Layout
/// The database is a flat directory with one file per table, index or log.
/// Each file is a sequence of equally sized blocks:
/// ```text
/// <db_directory>/
/// ├── student.tbl   ┌─────────┬─────────┬─────────┐
/// │                 │ Block 0 │ Block 1 │ Block 2 │
/// │                 └─────────┴─────────┴─────────┘
/// └── dept.tbl      Offset: 0   block_size  2×block_size
/// ```
///
/// Files only grow through [`append`](Self::append), so every file length is
/// an exact multiple of the block size.
///
/// # Thread Safety
/// `FileManager` is shared between threads as `Arc<FileManager>`. Every
/// operation runs under one manager-wide mutex, so at most one block
/// operation touches the disk at a time and the handle map is never raced.
///
/// # Durability
/// Writes and appends are followed by `sync_data()` before returning.
pub struct FileManager {
    db_directory: PathBuf,
    block_size: usize,
    /// Whether the directory was created by this manager.
    is_new: bool,
    /// Open handles, keyed by file name. Closed when the manager drops.
    open_files: Mutex<HashMap<String, File>>,
}

impl FileManager {
    /// Open the database directory, creating it if it does not exist.
    ///
    /// # Panics
    /// Panics if `block_size` is 0.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created.
    pub fn new<P: AsRef<Path>>(db_directory: P, block_size: usize) -> Result<Self> {
        assert!(block_size > 0, "block_size must be > 0");

        let db_directory = db_directory.as_ref().to_path_buf();
        let is_new = !db_directory.exists();
        if is_new {
            fs::create_dir_all(&db_directory)?;
        }

        info!(
            path = %db_directory.display(),
            block_size,
            is_new,
            "opened database directory"
        );

        Ok(Self {
            db_directory,
            block_size,
            is_new,
            open_files: Mutex::new(HashMap::new()),
        })
    }

    /// Read a block into `page`.
    ///
    /// # Errors
    /// - `Error::PageSizeMismatch` if the page is not one block long
    /// - `Error::BlockIo` if the seek or read fails, including reading a
    ///   block past the end of the file or one whose offset overflows
    pub fn read(&self, block: &BlockId, page: &mut Page) -> Result<()> {
        self.check_page(page)?;

        let mut files = self.open_files.lock();
        self.block_offset(block)
            .and_then(|offset| {
                let file = self.file(&mut files, block.filename())?;
                file.seek(SeekFrom::Start(offset))?;
                file.read_exact(page.contents_mut())
            })
            .map_err(|source| Error::BlockIo {
                block: block.clone(),
                source,
            })
    }

    /// Write `page` to a block.
    ///
    /// # Errors
    /// - `Error::PageSizeMismatch` if the page is not one block long
    /// - `Error::BlockIo` if the seek, write or sync fails, or the block's
    ///   offset overflows
    pub fn write(&self, block: &BlockId, page: &Page) -> Result<()> {
        self.check_page(page)?;

        let mut files = self.open_files.lock();
        self.block_offset(block)
            .and_then(|offset| {
                let file = self.file(&mut files, block.filename())?;
                file.seek(SeekFrom::Start(offset))?;
                file.write_all(page.contents())?;
                file.sync_data()
            })
            .map_err(|source| Error::BlockIo {
                block: block.clone(),
                source,
            })
    }

    /// Extend a file by one zeroed block and return its id.
    ///
    /// # Errors
    /// - `Error::FileIo` if the file cannot be opened or sized
    /// - `Error::BlockIo` if the new block cannot be written
    pub fn append(&self, filename: &str) -> Result<BlockId> {
        let mut files = self.open_files.lock();
        let (file, len) = self.file_len(&mut files, filename)?;

        let block = BlockId::new(filename, len / self.block_size as u64);

        let zeros = vec![0u8; self.block_size];
        self.block_offset(&block)
            .and_then(|offset| file.seek(SeekFrom::Start(offset)))
            .and_then(|_| file.write_all(&zeros))
            .and_then(|_| file.sync_data())
            .map_err(|source| Error::BlockIo {
                block: block.clone(),
                source,
            })?;

        debug!(%block, "appended block");
        Ok(block)
    }

    /// Number of blocks in a file. Creates an empty file on first touch.
    ///
    /// # Errors
    /// Returns `Error::FileIo` if the file cannot be opened or sized.
    pub fn length(&self, filename: &str) -> Result<u64> {
        let mut files = self.open_files.lock();
        let (_, len) = self.file_len(&mut files, filename)?;
        Ok(len / self.block_size as u64)
    }

    /// Bytes per block.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Whether the database directory was created by this manager.
    #[inline]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Root directory of the database.
    #[inline]
    pub fn db_directory(&self) -> &Path {
        &self.db_directory
    }

    /// Look up the cached handle for `filename`, opening it on first use.
    fn file<'a>(
        &self,
        files: &'a mut HashMap<String, File>,
        filename: &str,
    ) -> io::Result<&'a mut File> {
        match files.entry(filename.to_owned()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(self.db_directory.join(filename))?;
                debug!(filename, "opened file");
                Ok(entry.insert(file))
            }
        }
    }

    /// The cached handle for `filename` and its length in bytes.
    fn file_len<'a>(
        &self,
        files: &'a mut HashMap<String, File>,
        filename: &str,
    ) -> Result<(&'a mut File, u64)> {
        self.file(files, filename)
            .and_then(|file| {
                let len = file.metadata()?.len();
                Ok((file, len))
            })
            .map_err(|source| Error::FileIo {
                filename: filename.to_owned(),
                source,
            })
    }

    fn block_offset(&self, block: &BlockId) -> io::Result<u64> {
        block.offset(self.block_size).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "block offset overflows u64")
        })
    }

    fn check_page(&self, page: &Page) -> Result<()> {
        if page.len() != self.block_size {
            return Err(Error::PageSizeMismatch {
                expected: self.block_size,
                actual: page.len(),
            });
        }
        Ok(())
    }
}
