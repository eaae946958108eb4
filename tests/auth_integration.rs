//! Integration tests for the token lifecycle against a mock identity
//! provider.

use std::path::Path;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scriptorium_core::auth::{AuthError, Grant, Token, TokenManager, load_token_file, store_token_file};
use scriptorium_core::config::Settings;

mod support;
use support::socket_guard::start_mock_server_or_skip;

fn settings_for(server: &MockServer, token_path: &Path) -> Settings {
    Settings {
        auth_base_url: server.uri(),
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        scope: "writings".to_string(),
        token_path: token_path.to_path_buf(),
        ..Settings::default()
    }
}

fn token_body(access: &str, refresh: Option<&str>) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 3600,
        "scope": "writings"
    })
}

// ---- Client-credentials acquisition and persistence ----

#[tokio::test]
async fn test_client_credentials_acquires_and_persists_token() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = tempfile::TempDir::new().unwrap();
    let token_path = temp.path().join("token.json");

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=test-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh-token", None)))
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::new(&settings_for(&server, &token_path));
    let access = manager.get_valid_token().await.unwrap();
    assert_eq!(access, "fresh-token");

    // The token must survive a process restart
    let persisted = load_token_file(&token_path).unwrap().unwrap();
    assert_eq!(persisted.access_token, "fresh-token");
    assert!(persisted.is_valid());
}

#[tokio::test]
async fn test_valid_persisted_token_is_reused_without_network() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = tempfile::TempDir::new().unwrap();
    let token_path = temp.path().join("token.json");

    // No token endpoint mock mounted: any network call would 404 and fail
    let token = Token::from_grant("persisted-token".to_string(), None, 3600, "writings".to_string());
    store_token_file(&token_path, &token).unwrap();

    let manager = TokenManager::new(&settings_for(&server, &token_path));
    let access = manager.get_valid_token().await.unwrap();
    assert_eq!(access, "persisted-token");
}

// ---- Refresh flow ----

#[tokio::test]
async fn test_expiring_token_is_refreshed() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = tempfile::TempDir::new().unwrap();
    let token_path = temp.path().join("token.json");

    // 60s remaining is inside the 5 minute renewal skew
    let stale = Token::from_grant(
        "stale-token".to_string(),
        Some("refresh-abc".to_string()),
        60,
        "writings".to_string(),
    );
    store_token_file(&token_path, &stale).unwrap();

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("refreshed-token", Some("refresh-next"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::new(&settings_for(&server, &token_path));
    let access = manager.get_valid_token().await.unwrap();
    assert_eq!(access, "refreshed-token", "an expiring token must never be returned");

    let persisted = load_token_file(&token_path).unwrap().unwrap();
    assert_eq!(persisted.access_token, "refreshed-token");
    assert_eq!(persisted.refresh_token.as_deref(), Some("refresh-next"));
}

// ---- invalid_grant fallback ----

#[tokio::test]
async fn test_rejected_refresh_falls_back_to_client_credentials() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = tempfile::TempDir::new().unwrap();
    let token_path = temp.path().join("token.json");

    let stale = Token::from_grant(
        "stale-token".to_string(),
        Some("revoked-refresh".to_string()),
        60,
        "writings".to_string(),
    );
    store_token_file(&token_path, &stale).unwrap();

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(token_body("reauth-token", None)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::new(&settings_for(&server, &token_path));
    let access = manager.get_valid_token().await.unwrap();
    assert_eq!(access, "reauth-token");

    // The dead refresh token must not be persisted again
    let persisted = load_token_file(&token_path).unwrap().unwrap();
    assert!(persisted.refresh_token.is_none());
}

#[tokio::test]
async fn test_unavailable_when_refresh_and_reauth_both_fail() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = tempfile::TempDir::new().unwrap();
    let token_path = temp.path().join("token.json");

    let stale = Token::from_grant(
        "stale-token".to_string(),
        Some("revoked-refresh".to_string()),
        60,
        "writings".to_string(),
    );
    store_token_file(&token_path, &stale).unwrap();

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid_grant"}"#))
        .mount(&server)
        .await;

    let manager = TokenManager::new(&settings_for(&server, &token_path));
    let result = manager.get_valid_token().await;
    let err = result.unwrap_err();
    assert!(
        matches!(err, AuthError::Unavailable { .. }),
        "expected Unavailable, got: {err:?}"
    );
    let reason = err.to_string();
    assert!(reason.contains("refresh failed"), "reason should name both failures: {reason}");
    assert!(reason.contains("re-authentication failed"), "reason should name both failures: {reason}");
}

// ---- Explicit authentication ----

#[tokio::test]
async fn test_authenticate_rejection_carries_provider_payload() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = tempfile::TempDir::new().unwrap();
    let token_path = temp.path().join("token.json");

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"error":"invalid_client","error_description":"unknown client"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::new(&settings_for(&server, &token_path));
    let err = manager.authenticate(&Grant::ClientCredentials).await.unwrap_err();

    match err {
        AuthError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid_client"));
            assert!(body.contains("unknown client"));
        }
        other => panic!("expected Rejected, got: {other:?}"),
    }
    // Rejections are not retried: expect(1) above verifies a single call
    assert!(!token_path.exists(), "no token should be persisted on rejection");
}

#[tokio::test]
async fn test_authorization_code_grant_sends_code_and_redirect() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let temp = tempfile::TempDir::new().unwrap();
    let token_path = temp.path().join("token.json");

    Mock::given(method("POST"))
        .and(path("/connect/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code-123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("code-token", Some("refresh-1"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let manager = TokenManager::new(&settings_for(&server, &token_path));
    manager
        .authenticate(&Grant::AuthorizationCode {
            code: "auth-code-123".to_string(),
            redirect_uri: "http://localhost:8080/cb".to_string(),
        })
        .await
        .unwrap();

    let status = manager.status().await.unwrap();
    assert!(status.present);
    assert!(status.has_refresh_token);
}
