//! Persisted preferences for the `vegh` command line.
//!
//! A single JSON file holds the default upload target, bearer token and
//! snapshot author:
//! - `$XDG_CONFIG_HOME/vegh/config.json`, else `~/.config/vegh/config.json`
//! - `%APPDATA%\vegh\config.json` on Windows

mod preferences;

pub use preferences::{PreferenceKey, PreferenceStore, Preferences, config_base_dir};

/// Errors produced by the settings crate.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no configuration directory (set HOME or XDG_CONFIG_HOME)")]
    NoConfigDir,

    #[error("unknown setting: {0} (expected url, auth or author)")]
    UnknownKey(String),
}
