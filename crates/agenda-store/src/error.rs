//! Error types for agenda-store operations.

use std::path::PathBuf;

use thiserror::Error;

/// Why one candidate store could not be used. Every variant is scoped to a
/// single store; the run moves on to the next candidate.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Copying the base file or a present side file failed.
    #[error("failed to snapshot {}: {source}", .path.display())]
    Snapshot {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The snapshot could not be opened within the busy timeout.
    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: rusqlite::Error,
    },

    /// A read against an opened store failed.
    #[error("query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
