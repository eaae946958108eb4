//! Configuration: file settings merged with environment overrides.
//!
//! Settings come from an optional TOML file; credentials can also be
//! supplied through `SCRIPTORIUM_CLIENT_ID` / `SCRIPTORIUM_CLIENT_SECRET`
//! so they never need to live on disk. CLI flags override both.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

/// Default minimum delay between remote calls, in milliseconds.
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 1000;

/// Default minimum delay after a bulk binary download, in milliseconds.
pub const DEFAULT_DOWNLOAD_DELAY_MS: u64 = 2000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the config file.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Resolved runtime settings for the crawler and token manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the content API, e.g. `https://api.example.org`.
    pub api_base_url: String,
    /// Base URL of the identity provider hosting `/connect/token`.
    pub auth_base_url: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
    /// Requested token scope.
    pub scope: String,
    /// Where the token file is persisted.
    pub token_path: PathBuf,
    /// Where the catalog database lives.
    pub db_path: PathBuf,
    /// Minimum delay after every API call, in milliseconds.
    pub request_delay_ms: u64,
    /// Minimum delay after binary archive downloads, in milliseconds.
    pub download_delay_ms: u64,
    /// Optional cap on books fetched per folder (bounded sampling runs).
    pub max_books_per_folder: Option<u32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.example.org".to_string(),
            auth_base_url: "https://auth.example.org".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            scope: "writings".to_string(),
            token_path: PathBuf::from("token.json"),
            db_path: PathBuf::from("catalog.db"),
            request_delay_ms: DEFAULT_REQUEST_DELAY_MS,
            download_delay_ms: DEFAULT_DOWNLOAD_DELAY_MS,
            max_books_per_folder: None,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file, falling back to defaults when the
    /// file does not exist, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` when the file exists but cannot be read,
    /// or `ConfigError::Parse` when it is not valid TOML.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            debug!("no config file, using defaults");
            Self::default()
        };

        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Applies credential overrides from the environment.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("SCRIPTORIUM_CLIENT_ID") {
            self.client_id = id;
        }
        if let Ok(secret) = std::env::var("SCRIPTORIUM_CLIENT_SECRET") {
            self.client_secret = secret;
        }
    }
}
