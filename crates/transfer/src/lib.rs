//! Snapshot upload: direct or chunked, with progress tracking.
//!
//! Small files go out as one streamed request. Files at or above
//! [`CHUNK_THRESHOLD`] are split into [`CHUNK_SIZE`] byte ranges uploaded by
//! [`WORKER_CONCURRENCY`] concurrent workers; the receiver reassembles them
//! from the `X-Chunk-Index` header in whatever order they arrive.

mod chunked;
mod direct;
mod headers;
mod plan;
mod progress;
mod types;
mod uploader;

use std::path::PathBuf;

pub use chunked::{chunk_tasks, read_chunk};
pub use headers::{
    HEADER_CHUNK_INDEX, HEADER_FILE_NAME, HEADER_TOTAL_CHUNKS, encode_file_name,
};
pub use plan::plan;
pub use progress::{
    JobState, ProgressCallback, ProgressHandle, ProgressReporter, ProgressSnapshot, ProgressUpdate,
    SpeedCalculator,
};
pub use types::{ChunkTask, TransferConfig, TransferJob, TransferMode, TransferResult};
pub use uploader::Uploader;

/// Files of at least this many bytes are sent chunked: 100 MiB.
pub const CHUNK_THRESHOLD: u64 = 104_857_600;

/// Size of every chunk but the last: 10 MiB.
pub const CHUNK_SIZE: u64 = 10_485_760;

/// Concurrent chunk uploads.
pub const WORKER_CONCURRENCY: usize = 4;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("upload failed: {reason}")]
    TransferFailed { reason: String },

    #[error("chunk {index} failed: {reason}")]
    ChunkFailed { index: u64, reason: String },

    #[error("transfer aborted at chunk {failed_index}: {reason}")]
    TransferAborted { failed_index: u64, reason: String },

    #[error("cancelled")]
    Cancelled,
}
