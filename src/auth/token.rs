//! Token model and durable token-file persistence.
//!
//! The token file is plain JSON (`access_token`, `refresh_token`,
//! `expires_at`, `scope`) and is rewritten synchronously after every
//! successful grant or refresh, so a crash between a grant and its next
//! use never loses a still-valid token.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Remaining lifetime below which a token is treated as expiring (5 minutes).
pub const RENEWAL_SKEW_MS: i64 = 5 * 60 * 1000;

/// A bearer token with its expiry and scope.
///
/// The access and refresh token values are redacted in Debug output to
/// keep them out of logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct Token {
    /// Bearer access token (sensitive - never log).
    pub access_token: String,
    /// Refresh token, when the grant issued one (sensitive - never log).
    pub refresh_token: Option<String>,
    /// Expiry as epoch milliseconds.
    pub expires_at: i64,
    /// Scope granted by the provider.
    pub scope: String,
}

impl Token {
    /// Builds a token from a grant response, converting the provider's
    /// `expires_in` seconds into an absolute epoch-millisecond expiry.
    #[must_use]
    pub fn from_grant(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: i64,
        scope: String,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: now_ms() + expires_in_secs * 1000,
            scope,
        }
    }

    /// Returns true when the token still has more than the renewal skew
    /// of lifetime left.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        now_ms() < self.expires_at - RENEWAL_SKEW_MS
    }

    /// Remaining lifetime in milliseconds (may be negative once expired).
    #[must_use]
    pub fn remaining_ms(&self) -> i64 {
        self.expires_at - now_ms()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Current epoch time in milliseconds.
#[must_use]
#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Errors reading or writing the token file.
#[derive(Debug, thiserror::Error)]
pub enum TokenFileError {
    /// I/O failure on the token file.
    #[error("token file {path}: {source}")]
    Io {
        /// Token file path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The token file is not valid JSON.
    #[error("token file {path} is corrupt: {source}")]
    Corrupt {
        /// Token file path.
        path: PathBuf,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Loads a persisted token, returning `Ok(None)` when no file exists.
///
/// # Errors
///
/// Returns `TokenFileError::Io` on read failure or
/// `TokenFileError::Corrupt` when the file is not valid token JSON.
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_token_file(path: &Path) -> Result<Option<Token>, TokenFileError> {
    if !path.exists() {
        debug!("no token file");
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|source| TokenFileError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let token = serde_json::from_str(&raw).map_err(|source| TokenFileError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(token))
}

/// Persists a token synchronously, creating parent directories as needed.
///
/// # Errors
///
/// Returns `TokenFileError::Io` on write failure.
#[instrument(skip(path, token), fields(path = %path.display()))]
pub fn store_token_file(path: &Path, token: &Token) -> Result<(), TokenFileError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|source| TokenFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    }
    // Pretty output keeps the file inspectable during debugging.
    let raw = serde_json::to_string_pretty(token).map_err(|source| TokenFileError::Corrupt {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, raw).map_err(|source| TokenFileError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_token(expires_in_secs: i64) -> Token {
        Token::from_grant(
            "access-abc".to_string(),
            Some("refresh-xyz".to_string()),
            expires_in_secs,
            "writings".to_string(),
        )
    }

    #[test]
    fn test_token_with_long_lifetime_is_valid() {
        assert!(sample_token(3600).is_valid());
    }

    #[test]
    fn test_token_inside_renewal_skew_is_not_valid() {
        // 4 minutes remaining is inside the 5 minute skew
        assert!(!sample_token(240).is_valid());
    }

    #[test]
    fn test_token_expired_is_not_valid() {
        assert!(!sample_token(-60).is_valid());
    }

    #[test]
    fn test_token_debug_redacts_secrets() {
        let debug = format!("{:?}", sample_token(3600));
        assert!(!debug.contains("access-abc"));
        assert!(!debug.contains("refresh-xyz"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_store_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("auth/token.json");

        let token = sample_token(3600);
        store_token_file(&path, &token).unwrap();

        let loaded = load_token_file(&path).unwrap().unwrap();
        assert_eq!(loaded.access_token, token.access_token);
        assert_eq!(loaded.refresh_token, token.refresh_token);
        assert_eq!(loaded.expires_at, token.expires_at);
        assert_eq!(loaded.scope, token.scope);
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let temp = TempDir::new().unwrap();
        let loaded = load_token_file(&temp.path().join("none.json")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_corrupt_file_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let result = load_token_file(&path);
        assert!(matches!(result, Err(TokenFileError::Corrupt { .. })));
    }
}
