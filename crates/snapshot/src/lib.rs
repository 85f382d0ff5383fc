//! Snapshot archives: provenance metadata, integrity digests and the
//! archive engine contract.
//!
//! The transfer path never looks inside an archive. Everything that does
//! (packing, restoring, listing, metadata extraction) goes through the
//! [`ArchiveEngine`] trait so a different engine can be plugged in without
//! touching callers. [`TarZstdEngine`] is the engine shipped with the CLI.

pub mod analytics;
pub mod engine;
pub mod error;
mod filter;
pub mod integrity;
pub mod metadata;
pub mod tar_zstd;

pub use analytics::{LanguageSummary, ProjectStats};
pub use engine::{ArchiveEngine, CreateOptions, EntryKind, PlannedEntry, classify_entry};
pub use error::SnapshotError;
pub use integrity::{CheckReport, check, verify};
pub use metadata::{SnapshotMetadata, UNKNOWN, parse_metadata};
pub use tar_zstd::TarZstdEngine;

/// Name of the metadata sidecar embedded as the first archive entry.
pub const METADATA_ENTRY: &str = ".vegh.json";

/// Default zstd compression level.
pub const DEFAULT_LEVEL: i32 = 3;

/// Accepted compression levels.
pub const LEVEL_RANGE: std::ops::RangeInclusive<i32> = 1..=21;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SnapshotError>;
