//! Archive engine contract.
//!
//! The engine owns the archive's on-disk format. Callers only see paths,
//! counts, raw metadata bytes and errors.

use std::collections::BTreeMap;
use std::path::Path;

use crate::{DEFAULT_LEVEL, METADATA_ENTRY, Result};

/// Options for [`ArchiveEngine::create_archive`].
#[derive(Debug, Clone)]
pub struct CreateOptions {
    /// Compression level, 1 to 21.
    pub level: i32,
    pub comment: Option<String>,
    pub author: Option<String>,
    /// Glob patterns forced into the archive even when excluded or hidden.
    pub include: Vec<String>,
    /// Glob patterns dropped from the archive.
    pub exclude: Vec<String>,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            comment: None,
            author: None,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// A file that `create_archive` would pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    /// Path relative to the source directory, `/`-separated.
    pub path: String,
    pub size: u64,
}

/// Operations the rest of the workspace needs from an archive engine.
///
/// All methods block; async callers should run them on a blocking thread.
pub trait ArchiveEngine: Send + Sync {
    /// Packs `source_dir` into `output` and returns the number of files packed
    /// (the metadata sidecar is not counted).
    fn create_archive(&self, source_dir: &Path, output: &Path, options: &CreateOptions)
    -> Result<usize>;

    /// Lists what `create_archive` would pack, without writing anything.
    fn dry_run(&self, source_dir: &Path, include: &[String], exclude: &[String])
    -> Result<Vec<PlannedEntry>>;

    /// Extracts every user entry of `archive` under `dest_dir`.
    fn restore_archive(&self, archive: &Path, dest_dir: &Path) -> Result<()>;

    /// Returns every entry path in archive order, metadata sidecar included.
    fn list_entries(&self, archive: &Path) -> Result<Vec<String>>;

    /// Counts text lines per entry. Zero means binary or empty.
    fn count_lines_of_code(&self, archive: &Path) -> Result<BTreeMap<String, u64>>;

    /// Returns the raw metadata record stored in `archive`.
    fn read_metadata(&self, archive: &Path) -> Result<Vec<u8>>;
}

/// How a listed entry should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// The engine's metadata sidecar.
    Metadata,
    /// A file from the snapshotted tree.
    Content,
}

pub fn classify_entry(path: &str) -> EntryKind {
    let trimmed = path.strip_prefix("./").unwrap_or(path);
    if trimmed == METADATA_ENTRY {
        EntryKind::Metadata
    } else {
        EntryKind::Content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sidecar_is_labelled() {
        assert_eq!(classify_entry(".vegh.json"), EntryKind::Metadata);
        assert_eq!(classify_entry("./.vegh.json"), EntryKind::Metadata);
        assert_eq!(classify_entry("src/.vegh.json"), EntryKind::Content);
        assert_eq!(classify_entry("main.rs"), EntryKind::Content);
    }
}
