//! Disk I/O errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for disk operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during disk I/O.
#[derive(Debug, Error)]
pub enum DiskError {
    /// I/O error without path context.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying error.
        #[from]
        source: io::Error,
    },

    /// I/O error on a specific file.
    #[error("I/O error on {path}: {source}")]
    File {
        /// The file being accessed.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The caller's buffer does not match the configured page size.
    #[error("buffer length {actual} does not match page size {expected}")]
    BadBufferLength {
        /// Configured page size.
        expected: usize,
        /// Length of the buffer supplied.
        actual: usize,
    },
}

impl DiskError {
    /// Attaches path context to an I/O error.
    pub fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}
