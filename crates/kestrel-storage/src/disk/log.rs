//! Write-ahead log handle.

use std::sync::atomic::{AtomicU64, Ordering};

use kestrel_common::types::Lsn;

/// LSN allocator the buffer pool holds for write-ahead logging.
///
/// The pool does not call into it yet; it exists so the WAL can be wired in
/// without changing the pool's construction signature.
#[derive(Debug, Default)]
pub struct LogManager {
    next_lsn: AtomicU64,
}

impl LogManager {
    /// Creates a log manager starting at the first valid LSN.
    pub fn new() -> Self {
        Self {
            next_lsn: AtomicU64::new(Lsn::FIRST.as_u64()),
        }
    }

    /// Allocates and returns the next LSN.
    pub fn next_lsn(&self) -> Lsn {
        Lsn::new(self.next_lsn.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the most recently allocated LSN, or `Lsn::INVALID` if none
    /// has been handed out.
    pub fn current_lsn(&self) -> Lsn {
        Lsn::new(self.next_lsn.load(Ordering::Relaxed).saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lsn_allocation() {
        let log = LogManager::new();
        assert_eq!(log.current_lsn(), Lsn::INVALID);

        assert_eq!(log.next_lsn(), Lsn::FIRST);
        assert_eq!(log.next_lsn(), Lsn::new(2));
        assert_eq!(log.current_lsn(), Lsn::new(2));
    }
}
