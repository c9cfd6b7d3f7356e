//! Buffer pool errors.

use kestrel_common::types::PageId;
use thiserror::Error;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
pub enum BufferError {
    /// Every frame is pinned; nothing can be evicted to make room.
    #[error("no free frames available, all pages are pinned")]
    NoFreeFrames,

    /// The page is not in the buffer pool.
    #[error("page {page_id} is not resident in the buffer pool")]
    PageNotResident {
        /// The page that was requested.
        page_id: PageId,
    },

    /// The page's pin count is already zero.
    #[error("page {page_id} is not pinned")]
    NotPinned {
        /// The page that was unpinned.
        page_id: PageId,
    },

    /// The page is pinned and cannot be deleted.
    #[error("page {page_id} is pinned ({pin_count} pins)")]
    PagePinned {
        /// The page that was targeted.
        page_id: PageId,
        /// Its pin count at the time of the call.
        pin_count: u32,
    },

    /// The caller passed the invalid-page sentinel.
    #[error("invalid page ID: {page_id}")]
    InvalidPageId {
        /// The offending id.
        page_id: PageId,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Disk I/O failed. Fatal at this layer.
    #[error("disk error: {0}")]
    Disk(#[from] DiskError),
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if retrying after callers release pins could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoFreeFrames)
    }
}
