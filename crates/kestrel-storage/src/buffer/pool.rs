//! Buffer pool manager.
//!
//! The pool owns a fixed array of frames and serves bounded-memory access to
//! an unbounded set of disk pages: it fetches pages on demand, pins them
//! while callers use them, writes dirty pages back, and evicts cold frames
//! chosen by the LRU-K replacer.
//!
//! One pool-wide mutex serializes every public operation, which makes the
//! composite miss path (pick a victim, write it back, rebind, read, pin)
//! atomic with respect to other callers. The page table and replacer keep
//! their own locks, but those are only ever taken while the pool's mutex is
//! held, so the lock order is fixed and deadlock-free.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use kestrel_common::types::PageId;
use kestrel_index::ExtendibleHashTable;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{BufferFrame, FrameId};
use super::handle::PageHandle;
use super::replacer::LruKReplacer;
use super::BufferPoolStats;
use crate::disk::{DiskManager, LogManager};

/// State mutated only under the pool's mutex.
struct PoolState {
    /// Frames bound to no page, available without eviction.
    free_list: VecDeque<FrameId>,
    /// Next page id to hand out.
    next_page_id: u64,
}

impl PoolState {
    /// Returns a fresh, monotonically increasing page id.
    fn allocate_page(&mut self) -> PageId {
        let id = PageId::new(self.next_page_id);
        self.next_page_id += 1;
        id
    }
}

/// The buffer pool manager.
///
/// # Caller contract
///
/// Every successful [`new_page`](Self::new_page) or
/// [`fetch_page`](Self::fetch_page) must be matched by exactly one
/// [`unpin_page`](Self::unpin_page). A page's bytes may only be touched
/// between those two calls.
pub struct BufferPoolManager {
    config: BufferPoolConfig,
    frames: Vec<Arc<BufferFrame>>,
    /// Page table: maps resident page ids to their frames.
    page_table: ExtendibleHashTable<PageId, FrameId>,
    replacer: LruKReplacer,
    disk: Arc<DiskManager>,
    /// Held for WAL integration; not called on any current path.
    #[allow(dead_code)]
    log: Option<Arc<LogManager>>,
    state: Mutex<PoolState>,
    fetch_count: AtomicU64,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
    flush_count: AtomicU64,
}

impl BufferPoolManager {
    /// Creates a buffer pool over `disk`.
    ///
    /// All frames start on the free list.
    pub fn new(
        config: BufferPoolConfig,
        disk: Arc<DiskManager>,
        log: Option<Arc<LogManager>>,
    ) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;
        if config.page_size != disk.page_size() {
            return Err(BufferError::config(format!(
                "pool page size {} does not match disk page size {}",
                config.page_size,
                disk.page_size()
            )));
        }

        let frames: Vec<Arc<BufferFrame>> = (0..config.pool_size)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i), config.page_size)))
            .collect();
        let free_list = (0..config.pool_size).map(FrameId::new).collect();

        Ok(Self {
            page_table: ExtendibleHashTable::new(config.bucket_capacity),
            replacer: LruKReplacer::new(config.pool_size, config.replacer_k),
            frames,
            disk,
            log,
            state: Mutex::new(PoolState {
                free_list,
                next_page_id: 0,
            }),
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
            config,
        })
    }

    /// Creates a new zeroed page, pinned in a frame.
    ///
    /// Allocates a fresh page id only after a frame has been secured, so an
    /// id is never burned when the pool is full. Returns
    /// [`BufferError::NoFreeFrames`] when every frame is pinned.
    pub fn new_page(&self) -> BufferResult<PageHandle> {
        let mut state = self.state.lock();

        let frame_id = self.acquire_frame(&mut state)?;
        let page_id = state.allocate_page();
        self.install_page(frame_id, page_id);

        trace!(page = %page_id, frame = frame_id.index(), "created page");
        Ok(self.handle(frame_id, page_id))
    }

    /// Returns the page `page_id`, pinned in a frame.
    ///
    /// A resident page is pinned and returned without touching the disk.
    /// Otherwise a frame is acquired (evicting and writing back its old
    /// occupant if need be), the page is read from disk, and the frame is
    /// pinned. Returns [`BufferError::NoFreeFrames`] when every frame is
    /// pinned.
    pub fn fetch_page(&self, page_id: PageId) -> BufferResult<PageHandle> {
        if !page_id.is_valid() {
            return Err(BufferError::InvalidPageId { page_id });
        }

        let mut state = self.state.lock();
        self.fetch_count.fetch_add(1, Ordering::Relaxed);

        if let Some(frame_id) = self.page_table.get(&page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            self.frames[frame_id.index()].pin();
            self.replacer.record_access(frame_id);
            self.replacer.set_evictable(frame_id, false);
            return Ok(self.handle(frame_id, page_id));
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.acquire_frame(&mut state)?;
        self.install_page(frame_id, page_id);
        {
            let frame = &self.frames[frame_id.index()];
            self.disk.read_page(page_id, &mut frame.write_data()[..])?;
        }

        trace!(page = %page_id, frame = frame_id.index(), "fetched page from disk");
        Ok(self.handle(frame_id, page_id))
    }

    /// Releases one pin on `page_id`, folding `is_dirty` into the frame's
    /// dirty flag.
    ///
    /// When the pin count reaches zero the frame becomes evictable. Returns
    /// [`BufferError::PageNotResident`] if the page is not in the pool and
    /// [`BufferError::NotPinned`] if its pin count is already zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        let _state = self.state.lock();

        let frame_id = self
            .page_table
            .get(&page_id)
            .ok_or(BufferError::PageNotResident { page_id })?;
        let frame = &self.frames[frame_id.index()];

        if frame.pin_count() == 0 {
            return Err(BufferError::NotPinned { page_id });
        }
        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
        Ok(())
    }

    /// Writes `page_id`'s bytes to disk and clears its dirty flag.
    ///
    /// The write is unconditional; flushing a clean page is a no-op on the
    /// data but still hits the disk. Returns
    /// [`BufferError::PageNotResident`] if the page is not in the pool.
    pub fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        let _state = self.state.lock();

        let frame_id = self
            .page_table
            .get(&page_id)
            .ok_or(BufferError::PageNotResident { page_id })?;
        let frame = &self.frames[frame_id.index()];

        self.disk.write_page(page_id, &frame.read_data()[..])?;
        frame.set_dirty(false);
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes every resident page to disk and clears the dirty flags.
    pub fn flush_all_pages(&self) -> BufferResult<()> {
        let _state = self.state.lock();

        for frame in &self.frames {
            let page_id = frame.page_id();
            if !page_id.is_valid() {
                continue;
            }
            self.disk.write_page(page_id, &frame.read_data()[..])?;
            frame.set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Drops `page_id` from the pool and returns its frame to the free
    /// list.
    ///
    /// Deleting a page that is not resident succeeds trivially. Returns
    /// [`BufferError::PagePinned`] if callers still hold pins; nothing is
    /// written back, deletion discards the in-memory contents.
    pub fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        let mut state = self.state.lock();

        let Some(frame_id) = self.page_table.get(&page_id) else {
            return Ok(());
        };
        let frame = &self.frames[frame_id.index()];

        let pin_count = frame.pin_count();
        if pin_count > 0 {
            return Err(BufferError::PagePinned { page_id, pin_count });
        }

        self.page_table.remove(&page_id);
        self.replacer.remove(frame_id);
        frame.reset();
        frame.zero();
        state.free_list.push_back(frame_id);
        self.deallocate_page(page_id);

        debug!(page = %page_id, frame = frame_id.index(), "deleted page");
        Ok(())
    }

    /// Allocates a fresh page id without binding a frame.
    ///
    /// `new_page` is the usual entry point; this exists for callers that
    /// manage residency themselves.
    pub fn allocate_page(&self) -> PageId {
        self.state.lock().allocate_page()
    }

    /// Releases a page id.
    ///
    /// A placeholder: ids are not reused, reclaiming disk space is the disk
    /// manager's concern.
    pub fn deallocate_page(&self, _page_id: PageId) {}

    /// Returns true if `page_id` is resident.
    pub fn contains(&self, page_id: PageId) -> bool {
        let _state = self.state.lock();
        self.page_table.contains(&page_id)
    }

    /// Returns the number of frames.
    #[inline]
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    /// Returns the page size in bytes.
    #[inline]
    pub fn page_size(&self) -> usize {
        self.config.page_size
    }

    /// Returns the disk manager this pool reads and writes through.
    pub fn disk_manager(&self) -> &Arc<DiskManager> {
        &self.disk
    }

    /// Returns a snapshot of the pool's counters.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers, all called with the pool mutex held
    // -------------------------------------------------------------------------

    /// Secures a frame for a new binding: free list first, eviction second.
    ///
    /// A dirty victim is written back before its old binding is dropped, so
    /// rebinding never loses a write.
    fn acquire_frame(&self, state: &mut PoolState) -> BufferResult<FrameId> {
        let frame_id = if let Some(frame_id) = state.free_list.pop_front() {
            frame_id
        } else if let Some(frame_id) = self.replacer.evict() {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
            frame_id
        } else {
            return Err(BufferError::NoFreeFrames);
        };

        let frame = &self.frames[frame_id.index()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            self.disk.write_page(old_page_id, &frame.read_data()[..])?;
            self.flush_count.fetch_add(1, Ordering::Relaxed);
            debug!(page = %old_page_id, frame = frame_id.index(), "wrote back evicted page");
        }
        if old_page_id.is_valid() {
            self.page_table.remove(&old_page_id);
        }

        Ok(frame_id)
    }

    /// Binds a secured frame to `page_id`: zeroed, clean, pinned once,
    /// tracked by the replacer as unevictable.
    fn install_page(&self, frame_id: FrameId, page_id: PageId) {
        let frame = &self.frames[frame_id.index()];
        frame.reset();
        frame.set_page_id(page_id);
        frame.pin();
        frame.zero();

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id);
        self.replacer.set_evictable(frame_id, false);
    }

    fn handle(&self, frame_id: FrameId, page_id: PageId) -> PageHandle {
        PageHandle::new(Arc::clone(&self.frames[frame_id.index()]), page_id)
    }
}

impl std::fmt::Debug for BufferPoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPoolManager")
            .field("pool_size", &self.config.pool_size)
            .field("page_size", &self.config.page_size)
            .field("replacer_k", &self.config.replacer_k)
            .field("stats", &self.stats())
            .finish()
    }
}
