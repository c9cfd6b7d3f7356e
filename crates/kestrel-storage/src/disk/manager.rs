//! Synchronous page-granular disk I/O.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use kestrel_common::types::PageId;
use parking_lot::Mutex;
use tracing::debug;

use super::error::{DiskError, DiskResult};

/// Block-addressed page I/O over a single data file.
///
/// Pages live at offset `page_id * page_size`. Reads and writes are
/// synchronous; the file handle is shared behind a mutex so the manager can
/// be used from any thread.
pub struct DiskManager {
    path: PathBuf,
    file: Mutex<File>,
    page_size: usize,
    read_count: AtomicU64,
    write_count: AtomicU64,
}

impl DiskManager {
    /// Opens the data file at `path`, creating it if it does not exist.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| DiskError::file(&path, e))?;

        debug!(path = %path.display(), page_size, "opened data file");

        Ok(Self {
            path,
            file: Mutex::new(file),
            page_size,
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
        })
    }

    /// Reads the page `page_id` into `buf`.
    ///
    /// A page past the end of the file (allocated but never written) reads
    /// as zeroes, so reads are total for every id the pool has allocated.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        self.check_buffer(buf.len())?;
        self.read_count.fetch_add(1, Ordering::Relaxed);

        let offset = page_id.as_u64() * self.page_size as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| DiskError::file(&self.path, e))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(DiskError::file(&self.path, e)),
            }
        }
        buf[filled..].fill(0);

        Ok(())
    }

    /// Writes `buf` as the contents of page `page_id`.
    pub fn write_page(&self, page_id: PageId, buf: &[u8]) -> DiskResult<()> {
        self.check_buffer(buf.len())?;
        self.write_count.fetch_add(1, Ordering::Relaxed);

        let offset = page_id.as_u64() * self.page_size as u64;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))
            .map_err(|e| DiskError::file(&self.path, e))?;
        file.write_all(buf)
            .map_err(|e| DiskError::file(&self.path, e))?;

        Ok(())
    }

    /// Flushes file contents and metadata to stable storage.
    pub fn sync(&self) -> DiskResult<()> {
        let file = self.file.lock();
        file.sync_all().map_err(|e| DiskError::file(&self.path, e))
    }

    /// Returns the page size this manager was opened with.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the path of the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of whole pages currently in the file.
    pub fn num_pages(&self) -> DiskResult<u64> {
        let file = self.file.lock();
        let len = file
            .metadata()
            .map_err(|e| DiskError::file(&self.path, e))?
            .len();
        Ok(len / self.page_size as u64)
    }

    /// Returns the number of page reads issued.
    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Returns the number of page writes issued.
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    fn check_buffer(&self, len: usize) -> DiskResult<()> {
        if len != self.page_size {
            return Err(DiskError::BadBufferLength {
                expected: self.page_size,
                actual: len,
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for DiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskManager")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .field("reads", &self.read_count())
            .field("writes", &self.write_count())
            .finish()
    }
}
