//! Token lifecycle manager.
//!
//! Maintains exactly one valid bearer token per credential set, across
//! process restarts. Lifecycle: `Unauthenticated -> Authenticating ->
//! Valid -> Expiring -> Refreshing -> Valid | Failed`. A failed refresh
//! with `invalid_grant` clears the refresh token and falls back to a
//! client-credentials re-authentication instead of failing the run.

use std::path::PathBuf;

use reqwest::Client;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::token::{Token, TokenFileError, load_token_file, store_token_file};
use crate::config::Settings;

/// Errors from token acquisition.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The provider rejected the grant (bad credentials, bad code).
    /// Not retried automatically.
    #[error("authentication rejected (HTTP {status}): {body}")]
    Rejected {
        /// HTTP status from the token endpoint.
        status: u16,
        /// Provider error payload, verbatim.
        body: String,
    },

    /// No path to a valid token: refresh and re-authentication both failed.
    #[error("no valid token available: {reason}")]
    Unavailable {
        /// What failed along the way.
        reason: String,
    },

    /// Network-level failure reaching the token endpoint.
    #[error("token endpoint unreachable: {0}")]
    Network(#[source] reqwest::Error),

    /// Token file persistence failure.
    #[error(transparent)]
    TokenFile(#[from] TokenFileError),
}

/// Grant types supported against the token endpoint.
#[derive(Debug, Clone)]
pub enum Grant {
    /// `client_credentials` using the configured id/secret.
    ClientCredentials,
    /// `authorization_code` exchange.
    AuthorizationCode {
        /// The authorization code.
        code: String,
        /// Redirect URI the code was issued against.
        redirect_uri: String,
    },
}

/// Snapshot of the persisted token state, for `auth status` reporting.
#[derive(Debug, Clone)]
pub struct TokenStatus {
    /// Whether any token is persisted or held in memory.
    pub present: bool,
    /// Remaining lifetime in milliseconds, when a token exists.
    pub remaining_ms: Option<i64>,
    /// Whether a refresh token is available.
    pub has_refresh_token: bool,
    /// Granted scope, when a token exists.
    pub scope: Option<String>,
}

/// Shape of a successful token endpoint response.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
    scope: Option<String>,
}

/// Maintains one valid bearer token, refreshing or re-authenticating
/// transparently.
///
/// Constructed explicitly and passed by reference into [`crate::api::ApiClient`];
/// there is no ambient global instance.
#[derive(Debug)]
pub struct TokenManager {
    http: Client,
    auth_base_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    token_path: PathBuf,
    current: Mutex<Option<Token>>,
}

impl TokenManager {
    /// Creates a manager from resolved settings.
    #[must_use]
    pub fn new(settings: &Settings) -> Self {
        Self {
            http: Client::new(),
            auth_base_url: settings.auth_base_url.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            scope: settings.scope.clone(),
            token_path: settings.token_path.clone(),
            current: Mutex::new(None),
        }
    }

    /// Returns a usable access token string.
    ///
    /// Loads the persisted token when none is in memory; refreshes when
    /// the remaining lifetime is inside the renewal skew; falls back to a
    /// client-credentials re-authentication when no refresh token exists
    /// or the refresh is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unavailable`] only when both refresh and
    /// re-authentication fail.
    #[instrument(skip(self))]
    pub async fn get_valid_token(&self) -> Result<String, AuthError> {
        let mut current = self.current.lock().await;

        if current.is_none() {
            *current = load_token_file(&self.token_path)?;
            if current.is_some() {
                debug!("loaded persisted token");
            }
        }

        if let Some(token) = current.as_ref()
            && token.is_valid()
        {
            return Ok(token.access_token.clone());
        }

        // Expiring or absent: try refresh first, then fall back to a full
        // client-credentials re-authentication.
        let refresh_token = current.as_ref().and_then(|t| t.refresh_token.clone());

        let refresh_failure = if let Some(refresh_token) = refresh_token {
            debug!("token expiring, refreshing");
            match self.exchange_refresh(&refresh_token).await {
                Ok(token) => {
                    let access = token.access_token.clone();
                    store_token_file(&self.token_path, &token)?;
                    *current = Some(token);
                    info!("token refreshed");
                    return Ok(access);
                }
                Err(err) => {
                    if is_invalid_grant(&err) {
                        // The provider no longer honors this refresh token;
                        // drop it so we never present it again.
                        warn!("refresh token rejected with invalid_grant, discarding");
                        if let Some(token) = current.as_mut() {
                            token.refresh_token = None;
                        }
                    } else {
                        warn!(error = %err, "token refresh failed");
                    }
                    Some(err)
                }
            }
        } else {
            None
        };

        debug!("re-authenticating with client credentials");
        match self.exchange_grant(&Grant::ClientCredentials).await {
            Ok(token) => {
                let access = token.access_token.clone();
                store_token_file(&self.token_path, &token)?;
                *current = Some(token);
                info!("re-authenticated");
                Ok(access)
            }
            Err(reauth_err) => {
                let reason = match refresh_failure {
                    Some(refresh_err) => {
                        format!("refresh failed ({refresh_err}); re-authentication failed ({reauth_err})")
                    }
                    None => format!("re-authentication failed ({reauth_err})"),
                };
                Err(AuthError::Unavailable { reason })
            }
        }
    }

    /// Exchanges credentials or an authorization code for a token and
    /// persists the result.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Rejected`] with the provider's error payload
    /// attached when the grant is refused; not retried automatically.
    #[instrument(skip(self, grant), fields(grant = grant_name(grant)))]
    pub async fn authenticate(&self, grant: &Grant) -> Result<(), AuthError> {
        let token = self.exchange_grant(grant).await?;
        store_token_file(&self.token_path, &token)?;
        *self.current.lock().await = Some(token);
        info!("authenticated");
        Ok(())
    }

    /// Reports the current token state without touching the network.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenFile`] when the persisted file is corrupt.
    pub async fn status(&self) -> Result<TokenStatus, AuthError> {
        let current = self.current.lock().await;
        let token = match current.as_ref() {
            Some(token) => Some(token.clone()),
            None => load_token_file(&self.token_path)?,
        };
        Ok(match token {
            Some(token) => TokenStatus {
                present: true,
                remaining_ms: Some(token.remaining_ms()),
                has_refresh_token: token.refresh_token.is_some(),
                scope: Some(token.scope.clone()),
            },
            None => TokenStatus {
                present: false,
                remaining_ms: None,
                has_refresh_token: false,
                scope: None,
            },
        })
    }

    /// Issues a token endpoint request for a grant.
    async fn exchange_grant(&self, grant: &Grant) -> Result<Token, AuthError> {
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        match grant {
            Grant::ClientCredentials => {
                params.push(("grant_type", "client_credentials"));
            }
            Grant::AuthorizationCode { code, redirect_uri } => {
                params.push(("grant_type", "authorization_code"));
                params.push(("code", code.as_str()));
                params.push(("redirect_uri", redirect_uri.as_str()));
            }
        }
        self.token_endpoint(&params).await
    }

    /// Issues a refresh-token request.
    async fn exchange_refresh(&self, refresh_token: &str) -> Result<Token, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        self.token_endpoint(&params).await
    }

    /// POSTs form-encoded params to `{auth_base_url}/connect/token`.
    async fn token_endpoint(&self, params: &[(&str, &str)]) -> Result<Token, AuthError> {
        let url = format!("{}/connect/token", self.auth_base_url);
        let response = self
            .http
            .post(&url)
            .form(params)
            .send()
            .await
            .map_err(AuthError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let grant: TokenResponse = response.json().await.map_err(AuthError::Network)?;
        Ok(Token::from_grant(
            grant.access_token,
            grant.refresh_token,
            grant.expires_in,
            grant.scope.unwrap_or_else(|| self.scope.clone()),
        ))
    }
}

/// True when a rejection carries the provider's `invalid_grant` error code.
fn is_invalid_grant(err: &AuthError) -> bool {
    matches!(err, AuthError::Rejected { body, .. } if body.contains("invalid_grant"))
}

/// Short grant name for tracing fields.
fn grant_name(grant: &Grant) -> &'static str {
    match grant {
        Grant::ClientCredentials => "client_credentials",
        Grant::AuthorizationCode { .. } => "authorization_code",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_for(temp: &TempDir) -> Settings {
        Settings {
            token_path: temp.path().join("token.json"),
            ..Settings::default()
        }
    }

    #[tokio::test]
    async fn test_status_with_no_token_file_reports_absent() {
        let temp = TempDir::new().unwrap();
        let manager = TokenManager::new(&settings_for(&temp));

        let status = manager.status().await.unwrap();
        assert!(!status.present);
        assert!(status.remaining_ms.is_none());
        assert!(!status.has_refresh_token);
    }

    #[tokio::test]
    async fn test_status_reads_persisted_token() {
        let temp = TempDir::new().unwrap();
        let settings = settings_for(&temp);
        let token = Token::from_grant(
            "abc".to_string(),
            Some("ref".to_string()),
            3600,
            "writings".to_string(),
        );
        store_token_file(&settings.token_path, &token).unwrap();

        let manager = TokenManager::new(&settings);
        let status = manager.status().await.unwrap();
        assert!(status.present);
        assert!(status.has_refresh_token);
        assert!(status.remaining_ms.unwrap() > 0);
        assert_eq!(status.scope.as_deref(), Some("writings"));
    }

    #[test]
    fn test_invalid_grant_detection() {
        let rejected = AuthError::Rejected {
            status: 400,
            body: r#"{"error":"invalid_grant"}"#.to_string(),
        };
        assert!(is_invalid_grant(&rejected));

        let other = AuthError::Rejected {
            status: 400,
            body: r#"{"error":"invalid_client"}"#.to_string(),
        };
        assert!(!is_invalid_grant(&other));
    }
}
