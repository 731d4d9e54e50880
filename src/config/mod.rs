//! Configuration management.
//!
//! Settings are resolved per value with the priority
//! CLI flag > environment > config file > built-in default.
//!
//! The config file lives at `~/.cms-sync/config.json` (override with
//! `CMS_SYNC_CONFIG`). Every field is optional:
//!
//! ```json
//! {
//!   "api_base_url": "https://mgmt.cms.example.com",
//!   "api_token": "…",
//!   "root_dir": "./cms-files",
//!   "legacy_folders": false,
//!   "default_locale": "en-us",
//!   "default_channel": "website"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::store::{StoreLayout, StoreRoot};

pub const DEFAULT_API_BASE_URL: &str = "https://mgmt.cms.example.com";
pub const DEFAULT_ROOT_DIR: &str = "./cms-files";
pub const DEFAULT_LOCALE: &str = "en-us";
pub const DEFAULT_CHANNEL: &str = "website";

const ENV_CONFIG: &str = "CMS_SYNC_CONFIG";
const ENV_API_URL: &str = "CMS_SYNC_API_URL";
const ENV_TOKEN: &str = "CMS_SYNC_TOKEN";
const ENV_ROOT: &str = "CMS_SYNC_ROOT";
const ENV_LEGACY_FOLDERS: &str = "CMS_SYNC_LEGACY_FOLDERS";

/// Contents of the config file. Missing fields fall through to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub api_base_url: Option<String>,
    pub api_token: Option<String>,
    pub root_dir: Option<PathBuf>,
    pub legacy_folders: Option<bool>,
    pub default_locale: Option<String>,
    pub default_channel: Option<String>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub root: Option<PathBuf>,
    pub legacy_folders: bool,
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub root_dir: PathBuf,
    pub layout: StoreLayout,
    pub default_locale: String,
    pub default_channel: String,
}

impl SyncConfig {
    /// Load the config file and environment, then apply `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the config file exists but cannot be parsed.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let file = match config_path() {
            Some(path) => load_file(&path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(overrides, file, |name| std::env::var(name).ok()))
    }

    /// Merge the three sources. `env` looks up an environment variable.
    #[must_use]
    pub fn resolve(
        overrides: &Overrides,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

        let api_base_url = env(ENV_API_URL)
            .or(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let api_token = env(ENV_TOKEN).or(file.api_token);
        let root_dir = overrides
            .root
            .clone()
            .or_else(|| env(ENV_ROOT).map(PathBuf::from))
            .or(file.root_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT_DIR));

        let legacy = overrides.legacy_folders
            || env(ENV_LEGACY_FOLDERS)
                .map(|v| is_truthy(&v))
                .or(file.legacy_folders)
                .unwrap_or(false);

        Self {
            api_base_url,
            api_token,
            root_dir,
            layout: if legacy {
                StoreLayout::Legacy
            } else {
                StoreLayout::Nested
            },
            default_locale: file
                .default_locale
                .unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            default_channel: file
                .default_channel
                .unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
        }
    }

    /// The API token, required by every command that talks to an instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no token is configured.
    pub fn require_token(&self) -> Result<&str> {
        self.api_token
            .as_deref()
            .ok_or_else(|| Error::Config("no API token configured".to_string()))
    }

    #[must_use]
    pub fn store_root(&self) -> StoreRoot {
        StoreRoot::new(&self.root_dir, self.layout)
    }
}

/// `~/.cms-sync`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".cms-sync"))
}

/// Config file path: `CMS_SYNC_CONFIG`, else `~/.cms-sync/config.json`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    global_config_dir().map(|dir| dir.join("config.json"))
}

/// Read a config file. A missing file is an empty config.
///
/// # Errors
///
/// Returns [`Error::Config`] if the file cannot be read or parsed.
pub fn load_file(path: &Path) -> Result<FileConfig> {
    match std::fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(Error::Config(format!("{}: {e}", path.display()))),
    }
}

fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_lowercase().as_str(), "" | "0" | "false" | "no" | "off")
}
