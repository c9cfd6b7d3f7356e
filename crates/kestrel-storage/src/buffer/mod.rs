//! Buffer pool for KestrelDB.
//!
//! The buffer pool manages a fixed-size cache of pages in memory: pages are
//! fetched from disk on demand, pinned while in use, written back when
//! dirty, and evicted by backward K-distance when frames run out.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   BufferPoolManager                      │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │   Page Table: ExtendibleHashTable<PageId, FrameId> │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐     ┌─────────┐     │
//! │  │ Frame 0 │ │ Frame 1 │ │ Frame 2 │ ... │ Frame N │     │
//! │  │ page_id │ │ page_id │ │ page_id │     │ page_id │     │
//! │  │ data[]  │ │ data[]  │ │ data[]  │     │ data[]  │     │
//! │  │ pin/dty │ │ pin/dty │ │ pin/dty │     │ pin/dty │     │
//! │  └─────────┘ └─────────┘ └─────────┘     └─────────┘     │
//! │  ┌────────────────────┐  ┌─────────────────────────┐     │
//! │  │   LRU-K Replacer   │  │ Free list + id allocator│     │
//! │  └────────────────────┘  └─────────────────────────┘     │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kestrel_storage::buffer::{BufferPoolConfig, BufferPoolManager};
//! use kestrel_storage::disk::DiskManager;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let disk = Arc::new(DiskManager::open("data.db", 4096)?);
//!     let pool = BufferPoolManager::new(BufferPoolConfig::new(64), disk, None)?;
//!
//!     let mut page = pool.new_page()?;
//!     let page_id = page.page_id();
//!     page.data_mut()[0..5].copy_from_slice(b"hello");
//!     pool.unpin_page(page_id, true)?;
//!     pool.flush_page(page_id)?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod frame;
mod handle;
mod pool;
mod replacer;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use frame::{BufferFrame, FrameId};
pub use handle::PageHandle;
pub use pool::BufferPoolManager;
pub use replacer::LruKReplacer;

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of fetches served from memory.
    pub hits: u64,
    /// Number of fetches that required a disk read.
    pub misses: u64,
    /// Number of frames evicted to make room.
    pub evictions: u64,
    /// Number of page write-backs (explicit flushes and eviction writes).
    pub flushes: u64,
    /// Current number of pinned frames.
    pub pinned_frames: usize,
    /// Current number of dirty frames.
    pub dirty_frames: usize,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}
