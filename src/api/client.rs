//! Authenticated HTTP client for the remote writings API.
//!
//! Every call obtains a bearer token from the [`TokenManager`], issues
//! the request, translates failures into [`ApiError`], and then settles
//! the constant inter-request delay before returning. Token acquisition
//! failure short-circuits without touching the network.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, instrument, warn};

use super::error::ApiError;
use super::pacer::{DelayClass, RequestPacer};
use super::types::{
    BookRecord, ChapterRecord, FolderRecord, LanguageRecord, MaybePaged, ParagraphRecord,
    SearchHitRecord,
};
use crate::auth::TokenManager;
use crate::config::Settings;

/// Connect timeout for API calls, in seconds.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout, generous enough for archive downloads.
const READ_TIMEOUT_SECS: u64 = 300;

/// Rate-limited, authenticated client for the remote catalog.
///
/// Designed to be created once per run and shared; the pacer inside acts
/// as a global rate limit across all calls made through this client.
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    pacer: RequestPacer,
}

impl ApiClient {
    /// Creates a client from resolved settings.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(settings: &Settings, tokens: Arc<TokenManager>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            tokens,
            pacer: RequestPacer::new(
                Duration::from_millis(settings.request_delay_ms),
                Duration::from_millis(settings.download_delay_ms),
            ),
        }
    }

    /// Lists all catalog languages.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the uniform translation rules.
    #[instrument(skip(self))]
    pub async fn languages(&self) -> Result<Vec<LanguageRecord>, ApiError> {
        let url = format!("{}/content/languages", self.base_url);
        let page: MaybePaged<LanguageRecord> = self.get_json(&url).await?;
        Ok(page.into_items())
    }

    /// Lists the folder tree for a language. Children are nested in the
    /// response; no further calls are needed to walk them.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the uniform translation rules.
    #[instrument(skip(self))]
    pub async fn folders(&self, language_code: &str) -> Result<Vec<FolderRecord>, ApiError> {
        let url = format!(
            "{}/content/languages/{language_code}/folders",
            self.base_url
        );
        let page: MaybePaged<FolderRecord> = self.get_json(&url).await?;
        Ok(page.into_items())
    }

    /// Fetches one page of books for a folder using offset pagination.
    ///
    /// Callers must request pages in increasing offset order; the
    /// crawler's duplicate detection depends on it.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the uniform translation rules.
    #[instrument(skip(self))]
    pub async fn books_by_folder(
        &self,
        folder_id: i64,
        limit: u32,
        offset: u32,
    ) -> Result<MaybePaged<BookRecord>, ApiError> {
        let url = format!(
            "{}/content/books/by_folder/{folder_id}?limit={limit}&offset={offset}",
            self.base_url
        );
        self.get_json(&url).await
    }

    /// Fetches a single book by id.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the uniform translation rules.
    #[instrument(skip(self))]
    pub async fn book(&self, book_id: i64) -> Result<BookRecord, ApiError> {
        let url = format!("{}/content/books/{book_id}", self.base_url);
        self.get_json(&url).await
    }

    /// Fetches a book's chapter list.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the uniform translation rules.
    #[instrument(skip(self))]
    pub async fn book_toc(&self, book_id: i64) -> Result<Vec<ChapterRecord>, ApiError> {
        let url = format!("{}/content/books/{book_id}/toc", self.base_url);
        let page: MaybePaged<ChapterRecord> = self.get_json(&url).await?;
        Ok(page.into_items())
    }

    /// Fetches the paragraphs of one chapter, in reading order.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the uniform translation rules.
    #[instrument(skip(self))]
    pub async fn chapter_paragraphs(
        &self,
        book_id: i64,
        chapter_id: &str,
    ) -> Result<Vec<ParagraphRecord>, ApiError> {
        let url = format!(
            "{}/content/books/{book_id}/chapter/{chapter_id}",
            self.base_url
        );
        let page: MaybePaged<ParagraphRecord> = self.get_json(&url).await?;
        Ok(page.into_items())
    }

    /// Remote full-text search.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the uniform translation rules.
    #[instrument(skip(self))]
    pub async fn remote_search(
        &self,
        query: &str,
        language_code: Option<&str>,
        limit: u32,
        offset: u32,
    ) -> Result<MaybePaged<SearchHitRecord>, ApiError> {
        let mut url = url::Url::parse(&format!("{}/search", self.base_url))
            .map_err(|_| ApiError::Remote {
                url: self.base_url.clone(),
                status: 0,
                body: "invalid base URL".to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("limit", &limit.to_string())
            .append_pair("offset", &offset.to_string());
        if let Some(lang) = language_code {
            url.query_pairs_mut().append_pair("lang", lang);
        }
        self.get_json(url.as_str()).await
    }

    /// Remote search suggestions for a partial query.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the uniform translation rules.
    #[instrument(skip(self))]
    pub async fn search_suggestions(&self, query: &str) -> Result<Vec<String>, ApiError> {
        let mut url = url::Url::parse(&format!("{}/search/suggestions", self.base_url))
            .map_err(|_| ApiError::Remote {
                url: self.base_url.clone(),
                status: 0,
                body: "invalid base URL".to_string(),
            })?;
        url.query_pairs_mut().append_pair("query", query);
        self.get_json(url.as_str()).await
    }

    /// Downloads a book's binary archive to `output_dir`, streaming to
    /// disk. Uses the longer download delay class.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] per the uniform translation rules, or
    /// [`ApiError::Io`] if writing to disk fails.
    #[instrument(skip(self, output_dir), fields(dir = %output_dir.display()))]
    pub async fn download_archive(
        &self,
        book_id: i64,
        output_dir: &Path,
    ) -> Result<PathBuf, ApiError> {
        let url = format!("{}/content/books/{book_id}/download", self.base_url);
        let result = self.download_inner(&url, book_id, output_dir).await;
        self.pacer.settle(DelayClass::Download).await;
        result
    }

    async fn download_inner(
        &self,
        url: &str,
        book_id: i64,
        output_dir: &Path,
    ) -> Result<PathBuf, ApiError> {
        let response = self.send_authorized(url).await?;

        let path = output_dir.join(format!("{book_id}.zip"));
        let file = File::create(&path)
            .await
            .map_err(|source| ApiError::io(&path, source))?;
        let mut writer = BufWriter::new(file);

        let mut stream = response.bytes_stream();
        let mut bytes_written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| ApiError::network(url, source))?;
            writer
                .write_all(&chunk)
                .await
                .map_err(|source| ApiError::io(&path, source))?;
            bytes_written += chunk.len() as u64;
        }
        writer
            .flush()
            .await
            .map_err(|source| ApiError::io(&path, source))?;

        debug!(bytes = bytes_written, path = %path.display(), "archive downloaded");
        Ok(path)
    }

    /// GET + decode with the standard delay class.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let result = self.get_json_inner(url).await;
        self.pacer.settle(DelayClass::Request).await;
        result
    }

    async fn get_json_inner<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send_authorized(url).await?;
        response
            .json()
            .await
            .map_err(|source| ApiError::decode(url, source))
    }

    /// Sends an authorized GET and translates the status uniformly.
    async fn send_authorized(&self, url: &str) -> Result<reqwest::Response, ApiError> {
        let token = self
            .tokens
            .get_valid_token()
            .await
            .map_err(ApiError::AuthUnavailable)?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| ApiError::network(url, source))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            warn!(url, "request rejected with 401");
            return Err(ApiError::AuthRejected {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Remote {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
