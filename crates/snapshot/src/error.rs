//! Snapshot error types.

use std::path::PathBuf;

/// Errors produced while reading, verifying or building snapshots.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive engine error: {0}")]
    Engine(String),

    #[error("metadata record is corrupt: {0}")]
    MetadataCorrupt(String),

    #[error("metadata not found in snapshot")]
    MetadataMissing,
}

impl SnapshotError {
    /// Wraps an I/O failure from the engine with the step that failed.
    pub(crate) fn engine(step: &str, err: impl std::fmt::Display) -> Self {
        Self::Engine(format!("{step}: {err}"))
    }

    /// Maps an open failure on `path`, keeping "missing" distinct from other
    /// I/O problems.
    pub(crate) fn open(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io(err)
        }
    }
}
