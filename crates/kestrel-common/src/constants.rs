//! System-wide constants for KestrelDB.

// =============================================================================
// Page and Memory Constants
// =============================================================================

/// Default page size in bytes (4 KB).
///
/// Matches the common OS page size and SSD block size.
pub const DEFAULT_PAGE_SIZE: usize = 4 * 1024;

/// Minimum page size in bytes (512 B).
pub const MIN_PAGE_SIZE: usize = 512;

/// Maximum page size in bytes (64 KB).
pub const MAX_PAGE_SIZE: usize = 64 * 1024;

// =============================================================================
// Buffer Pool Constants
// =============================================================================

/// Default number of frames in the buffer pool.
pub const DEFAULT_POOL_SIZE: usize = 128;

/// Default K parameter for the LRU-K replacer.
///
/// K = 2 distinguishes pages touched once (a scan) from pages touched
/// repeatedly (a working set) at minimal bookkeeping cost.
pub const DEFAULT_REPLACER_K: usize = 2;

/// Default capacity of a page-table hash bucket.
pub const DEFAULT_BUCKET_CAPACITY: usize = 4;
