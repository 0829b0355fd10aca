//! Error types for the simulator.
//!
//! Only run-ending conditions live here. Per-address problems (an address
//! out of the flat table's range, a failed word read) are ordinary data
//! carried in `TranslationRecord` so one bad address never aborts a run.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for simulator operations.
pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Error, Debug)]
pub enum VmError {
    /// Page size outside the supported set.
    #[error("invalid page size {0}: use 256, 1024, 2048 or 4096")]
    InvalidPageSize(usize),

    /// Single-address invocation with an unparsable address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Backing store could not be opened while a fault was being serviced.
    #[error("cannot open backing store {path}: {source}")]
    BackingStoreUnavailable {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Allocator constructed with an empty frame pool.
    #[error("frame pool is empty: at least one physical frame is required")]
    NoFrames,

    /// IO error on a file the run cannot proceed without.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl VmError {
    /// Exit code reported by the binary for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            VmError::InvalidPageSize(_) | VmError::InvalidAddress(_) => 2,
            _ => 1,
        }
    }
}
