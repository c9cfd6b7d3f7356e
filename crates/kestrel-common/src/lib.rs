//! # kestrel-common
//!
//! Common types and constants for KestrelDB.
//!
//! This crate provides the foundational pieces shared across the storage
//! engine:
//!
//! - **Types**: Core identifiers (`PageId`, `Lsn`)
//! - **Constants**: System-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use kestrel_common::types::PageId;
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

pub use constants::*;
pub use types::{Lsn, PageId};
