//! Provenance record embedded in every snapshot.
//!
//! Every field is optional on the wire. Defaults are applied only by the
//! `*_display` accessors so the literal fallback never ends up persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::SnapshotError;

/// Fallback shown for fields the record does not carry.
pub const UNKNOWN: &str = "Unknown";

/// Snapshot provenance, written once at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(default, deserialize_with = "non_empty")]
    pub author: Option<String>,

    /// Creation time in seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: Option<i64>,

    #[serde(default, deserialize_with = "non_empty")]
    pub tool_version: Option<String>,

    #[serde(default, deserialize_with = "non_empty")]
    pub comment: Option<String>,
}

impl SnapshotMetadata {
    /// Builds the record for a snapshot created now by this tool.
    pub fn now(author: Option<String>, comment: Option<String>) -> Self {
        Self {
            author: author.filter(|a| !a.is_empty()),
            timestamp: Some(Utc::now().timestamp()),
            tool_version: Some(tool_version()),
            comment: comment.filter(|c| !c.is_empty()),
        }
    }

    /// Serializes the record the way the engine stores it.
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        serde_json::to_string_pretty(self).map_err(|e| SnapshotError::MetadataCorrupt(e.to_string()))
    }

    pub fn author_display(&self) -> &str {
        self.author.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn tool_display(&self) -> &str {
        self.tool_version.as_deref().unwrap_or(UNKNOWN)
    }

    /// Creation time as `YYYY-MM-DD HH:MM:SS UTC`.
    pub fn created_display(&self) -> String {
        self.created_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0))
    }
}

/// Version tag written into new snapshots.
pub fn tool_version() -> String {
    format!("Vegh {}", env!("CARGO_PKG_VERSION"))
}

/// Decodes a raw metadata record.
///
/// The record must be a JSON object; anything else is corrupt. Missing
/// fields are not errors.
pub fn parse_metadata(raw: &[u8]) -> Result<SnapshotMetadata, SnapshotError> {
    let value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|e| SnapshotError::MetadataCorrupt(e.to_string()))?;
    if !value.is_object() {
        return Err(SnapshotError::MetadataCorrupt(
            "expected a JSON object".into(),
        ));
    }
    serde_json::from_value(value).map_err(|e| SnapshotError::MetadataCorrupt(e.to_string()))
}

// Older snapshots store an empty string for "no comment".
fn non_empty<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
