//! Core types for KestrelDB.

mod ids;

pub use ids::{Lsn, PageId};
