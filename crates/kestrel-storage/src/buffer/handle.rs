//! Page handles returned by the buffer pool.

use std::sync::Arc;

use kestrel_common::types::PageId;
use parking_lot::{MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLockReadGuard, RwLockWriteGuard};

use super::frame::{BufferFrame, FrameId};

/// A pinned page.
///
/// Handed out by `new_page` and `fetch_page` while the frame's pin is held.
/// Dropping the handle does NOT release the pin: every successful
/// `new_page`/`fetch_page` must be matched by exactly one `unpin_page` call,
/// and touching the data after that unpin is a caller bug.
pub struct PageHandle {
    frame: Arc<BufferFrame>,
    page_id: PageId,
}

impl PageHandle {
    pub(crate) fn new(frame: Arc<BufferFrame>, page_id: PageId) -> Self {
        Self { frame, page_id }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the frame this page is resident in.
    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame.frame_id()
    }

    /// Returns read access to the page bytes.
    #[inline]
    pub fn data(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.frame.read_data(), Vec::as_slice)
    }

    /// Returns write access to the page bytes.
    ///
    /// Report the modification through `unpin_page(.., true)`; writing
    /// through the handle does not set the dirty flag by itself.
    #[inline]
    pub fn data_mut(&mut self) -> MappedRwLockWriteGuard<'_, [u8]> {
        RwLockWriteGuard::map(self.frame.write_data(), Vec::as_mut_slice)
    }
}

impl std::fmt::Debug for PageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageHandle")
            .field("page_id", &self.page_id)
            .field("frame_id", &self.frame.frame_id())
            .finish()
    }
}
