//! # kestrel-index
//!
//! In-memory index structures for KestrelDB.
//!
//! The main export is [`ExtendibleHashTable`], a thread-safe key-value index
//! that grows its directory dynamically as buckets fill up. The buffer pool
//! uses it as the page table (`PageId -> FrameId`), but it is generic over
//! any hashable key.
//!
//! # Example
//!
//! ```rust
//! use kestrel_index::ExtendibleHashTable;
//!
//! let table = ExtendibleHashTable::new(4);
//! table.insert(1u64, "one");
//! assert_eq!(table.get(&1), Some("one"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod extendible;

pub use extendible::ExtendibleHashTable;
