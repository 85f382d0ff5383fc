//! Integrity digest and the combined "check" report.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::engine::ArchiveEngine;
use crate::metadata::{SnapshotMetadata, parse_metadata};
use crate::SnapshotError;

const READ_BUF: usize = 64 * 1024;

/// Computes the SHA-256 of the archive at `path` and returns it hex-encoded.
///
/// The file is streamed, never loaded whole. The digest is evidence only;
/// nothing here compares it against a stored value.
pub fn verify(path: &Path) -> Result<String, SnapshotError> {
    let mut file = std::fs::File::open(path).map_err(|e| SnapshotError::open(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; READ_BUF];
    let mut total: u64 = 0;
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    debug!(path = %path.display(), bytes = total, "digest computed");
    Ok(hex::encode(hasher.finalize()))
}

/// Digest plus decoded metadata for one archive.
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub digest: String,
    pub metadata: SnapshotMetadata,
}

/// Hashes the archive and decodes the metadata the engine stored in it.
pub fn check(engine: &dyn ArchiveEngine, path: &Path) -> Result<CheckReport, SnapshotError> {
    let digest = verify(path)?;
    let raw = engine.read_metadata(path)?;
    let metadata = parse_metadata(&raw)?;
    Ok(CheckReport { digest, metadata })
}
