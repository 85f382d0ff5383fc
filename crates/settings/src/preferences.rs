use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SettingsError;

const APP_DIR: &str = "vegh";
const FILE_NAME: &str = "config.json";

// ---------------------------------------------------------------------------
// Preferences
// ---------------------------------------------------------------------------

/// Stored defaults. Absent values are omitted from the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Upload endpoint used by `send` when no URL is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Bearer token sent with uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,

    /// Author recorded in new snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Settable preference names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceKey {
    Url,
    Auth,
    Author,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 3] = [Self::Url, Self::Auth, Self::Author];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Auth => "auth",
            Self::Author => "author",
        }
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PreferenceKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "url" => Ok(Self::Url),
            "auth" | "token" => Ok(Self::Auth),
            "author" => Ok(Self::Author),
            other => Err(SettingsError::UnknownKey(other.to_string())),
        }
    }
}

impl Preferences {
    pub fn get(&self, key: PreferenceKey) -> Option<&str> {
        match key {
            PreferenceKey::Url => self.url.as_deref(),
            PreferenceKey::Auth => self.auth.as_deref(),
            PreferenceKey::Author => self.author.as_deref(),
        }
    }

    /// Sets `key`; an empty value clears it.
    pub fn set(&mut self, key: PreferenceKey, value: &str) {
        let value = Some(value.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        match key {
            PreferenceKey::Url => self.url = value,
            PreferenceKey::Auth => self.auth = value,
            PreferenceKey::Author => self.author = value,
        }
    }

    /// Merges per-invocation values over the stored ones.
    pub fn resolve(&self, url: Option<String>, auth: Option<String>) -> Preferences {
        Preferences {
            url: url.or_else(|| self.url.clone()),
            auth: auth.or_else(|| self.auth.clone()),
            author: self.author.clone(),
        }
    }

    /// Value for display: the token is masked down to its last four chars.
    pub fn display_value(&self, key: PreferenceKey) -> String {
        match (key, self.get(key)) {
            (_, None) => "(not set)".into(),
            (PreferenceKey::Auth, Some(token)) => mask(token),
            (_, Some(value)) => value.to_string(),
        }
    }
}

fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Loads and saves [`Preferences`] at one file path.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    /// Store at the platform config location.
    pub fn open_default() -> Result<Self, SettingsError> {
        let base = config_base_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::at(base.join(APP_DIR).join(FILE_NAME)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the stored preferences.
    ///
    /// A missing file yields defaults. So does an unparsable one, after a
    /// warning; the next save overwrites it.
    pub fn load(&self) -> Result<Preferences, SettingsError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Preferences::default());
            }
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Preferences>(&content) {
            Ok(prefs) => Ok(prefs),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to parse preferences, using defaults"
                );
                Ok(Preferences::default())
            }
        }
    }

    /// Writes `prefs`, creating the directory as needed. The file is readable
    /// by the owner only since it may hold a token.
    pub fn save(&self, prefs: &Preferences) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(prefs)?;
        let mut file = open_owner_only(&self.path)?;
        file.write_all(json.as_bytes())?;
        tracing::debug!(path = %self.path.display(), "preferences saved");
        Ok(())
    }

    /// Deletes the file. Already absent is fine.
    pub fn reset(&self) -> Result<(), SettingsError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Opens `path` for writing, truncated. On unix a new file is created 0600
/// and an existing one is narrowed to 0600 before anything is written.
fn open_owner_only(path: &Path) -> std::io::Result<std::fs::File> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let file = options.open(path)?;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
        Ok(file)
    }
    #[cfg(not(unix))]
    {
        options.open(path)
    }
}

/// Base directory for per-user configuration.
pub fn config_base_dir() -> Option<PathBuf> {
    base_dir_from(|name| std::env::var_os(name))
}

fn base_dir_from(var: impl Fn(&str) -> Option<OsString>) -> Option<PathBuf> {
    let non_empty = |name: &str| var(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    if cfg!(windows) {
        return non_empty("APPDATA");
    }
    non_empty("XDG_CONFIG_HOME")
        .filter(|p| p.is_absolute())
        .or_else(|| non_empty("HOME").map(|home| home.join(".config")))
}
