//! Request headers shared by every upload request of a job.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};

use crate::{ChunkTask, TransferError, TransferJob};

/// `X-File-Name`: final path component of the uploaded file.
pub const HEADER_FILE_NAME: &str = "x-file-name";
/// `X-Chunk-Index`: 0-based chunk index.
pub const HEADER_CHUNK_INDEX: &str = "x-chunk-index";
/// `X-Total-Chunks`: number of chunks in the job.
pub const HEADER_TOTAL_CHUNKS: &str = "x-total-chunks";

// Non-ASCII bytes are always escaped by `utf8_percent_encode`.
const FILE_NAME_ESCAPES: &AsciiSet = &CONTROLS.add(b'%');

/// Validates a file name for `X-File-Name` and escapes it into a header-safe
/// value.
///
/// Rejects empty names, path separators and dot-only names so a receiver
/// joining the name onto a directory cannot be walked out of it.
pub fn encode_file_name(name: &str) -> Result<String, TransferError> {
    if name.is_empty() {
        return Err(TransferError::InvalidHeader("empty file name".into()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(TransferError::InvalidHeader(format!(
            "file name contains a path separator: {name}"
        )));
    }
    if name == "." || name == ".." {
        return Err(TransferError::InvalidHeader(format!(
            "file name not allowed: {name}"
        )));
    }
    Ok(utf8_percent_encode(name, FILE_NAME_ESCAPES).to_string())
}

/// Headers identical across every request of `job`: file name and, when
/// configured, the bearer token.
pub(crate) fn job_headers(job: &TransferJob) -> Result<HeaderMap, TransferError> {
    let mut headers = HeaderMap::new();
    let name = encode_file_name(&job.file_name())?;
    headers.insert(
        HeaderName::from_static(HEADER_FILE_NAME),
        HeaderValue::from_str(&name).map_err(|e| TransferError::InvalidHeader(e.to_string()))?,
    );
    if let Some(token) = &job.auth_token {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| TransferError::InvalidHeader("auth token has invalid characters".into()))?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

/// Job headers plus the chunk's index and the total count.
pub(crate) fn chunk_headers(base: &HeaderMap, task: &ChunkTask) -> HeaderMap {
    let mut headers = base.clone();
    headers.insert(
        HeaderName::from_static(HEADER_CHUNK_INDEX),
        HeaderValue::from(task.index),
    );
    headers.insert(
        HeaderName::from_static(HEADER_TOTAL_CHUNKS),
        HeaderValue::from(task.total_chunks),
    );
    headers
}
