use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::{CHUNK_SIZE, CHUNK_THRESHOLD, TransferError, WORKER_CONCURRENCY};

/// Strategy picked for a job before any bytes move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    Direct,
    Chunked,
}

impl std::fmt::Display for TransferMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Chunked => f.write_str("chunked"),
        }
    }
}

/// Tuning knobs. Defaults are the protocol constants; receivers that
/// interoperate rely on them, so only tests should change them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferConfig {
    pub threshold: u64,
    pub chunk_size: u64,
    pub concurrency: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            threshold: CHUNK_THRESHOLD,
            chunk_size: CHUNK_SIZE,
            concurrency: WORKER_CONCURRENCY,
        }
    }
}

impl TransferConfig {
    pub fn validate(&self) -> Result<(), TransferError> {
        if self.chunk_size == 0 {
            return Err(TransferError::InvalidConfig("chunk size must be positive".into()));
        }
        if self.concurrency == 0 {
            return Err(TransferError::InvalidConfig(
                "worker concurrency must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// One invocation of "send". Built from user input, consumed once.
#[derive(Debug, Clone)]
pub struct TransferJob {
    /// Correlates log lines for this job.
    pub id: Uuid,
    pub file_path: PathBuf,
    pub file_size: u64,
    pub target_url: String,
    pub auth_token: Option<String>,
    pub force_chunk: bool,
}

impl TransferJob {
    /// Stats `file_path` and builds a job.
    ///
    /// Local preconditions are checked here so nothing touches the network
    /// for a missing or unreadable file.
    pub fn from_path(
        file_path: &Path,
        target_url: impl Into<String>,
        auth_token: Option<String>,
        force_chunk: bool,
    ) -> Result<Self, TransferError> {
        let meta = std::fs::metadata(file_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TransferError::NotFound(file_path.to_path_buf())
            } else {
                TransferError::Io(e)
            }
        })?;
        if !meta.is_file() {
            return Err(TransferError::NotAFile(file_path.to_path_buf()));
        }
        // Fail on unreadable files now rather than from inside a worker.
        std::fs::File::open(file_path)?;

        Ok(Self {
            id: Uuid::new_v4(),
            file_path: file_path.to_path_buf(),
            file_size: meta.len(),
            target_url: target_url.into(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
            force_chunk,
        })
    }

    /// Final path component, as sent in `X-File-Name`.
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A byte range of the source file uploaded as one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTask {
    pub index: u64,
    pub offset: u64,
    pub length: u64,
    pub total_chunks: u64,
}

/// Terminal success of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferResult {
    /// Single request; the receiver's status and response body.
    Direct { status: u16, body: String },
    /// Every chunk was acknowledged.
    Chunked { total_chunks: u64 },
}

impl TransferResult {
    pub fn mode(&self) -> TransferMode {
        match self {
            Self::Direct { .. } => TransferMode::Direct,
            Self::Chunked { .. } => TransferMode::Chunked,
        }
    }
}
