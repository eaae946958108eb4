//! Error types for remote API access.
//!
//! Uniform translation applied at the client boundary: 401 becomes
//! [`ApiError::AuthRejected`], other non-2xx becomes [`ApiError::Remote`],
//! and a failed token acquisition never reaches the network at all.

use std::path::PathBuf;

use thiserror::Error;

use crate::auth::AuthError;

/// Errors that can occur calling the remote API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No valid token could be obtained; the request was not sent.
    #[error("authentication unavailable: {0}")]
    AuthUnavailable(#[source] AuthError),

    /// The remote service answered HTTP 401. Retry/refresh is the
    /// caller's responsibility, never the client's.
    #[error("request rejected (HTTP 401): {url}")]
    AuthRejected {
        /// The rejected request URL.
        url: String,
    },

    /// Non-auth HTTP failure (4xx/5xx).
    #[error("remote error HTTP {status} for {url}")]
    Remote {
        /// The failing request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Network-level error (DNS, connect, TLS, timeout).
    #[error("network error for {url}: {source}")]
    Network {
        /// The failing request URL.
        url: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body did not match any expected shape.
    #[error("invalid response from {url}: {source}")]
    Decode {
        /// The request URL.
        url: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },

    /// File system error while saving a downloaded archive.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// Destination path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Creates a network error with request context.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates a decode error with request context.
    pub fn decode(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Decode {
            url: url.into(),
            source,
        }
    }

    /// Creates an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for failures that abort an entire run (no token path at all).
    /// Everything else is contained at folder/book granularity.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::AuthUnavailable(_) | Self::AuthRejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_errors_are_fatal() {
        let unavailable = ApiError::AuthUnavailable(AuthError::Unavailable {
            reason: "both paths failed".to_string(),
        });
        assert!(unavailable.is_fatal());

        let rejected = ApiError::AuthRejected {
            url: "https://api.test/content/languages".to_string(),
        };
        assert!(rejected.is_fatal());
    }

    #[test]
    fn test_remote_errors_are_contained() {
        let remote = ApiError::Remote {
            url: "https://api.test/content/books/by_folder/7".to_string(),
            status: 503,
            body: String::new(),
        };
        assert!(!remote.is_fatal());
    }

    #[test]
    fn test_remote_error_display_carries_status_and_url() {
        let remote = ApiError::Remote {
            url: "https://api.test/x".to_string(),
            status: 404,
            body: "missing".to_string(),
        };
        let msg = remote.to_string();
        assert!(msg.contains("404"), "expected status in: {msg}");
        assert!(msg.contains("https://api.test/x"), "expected URL in: {msg}");
    }
}
