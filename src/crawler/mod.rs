//! Catalog crawler.
//!
//! Produces a complete, deduplicated snapshot of the remote catalog in
//! the content store. The remote pagination metadata is unreliable: the
//! `count` field disagrees with reality and pages can repeat records, so
//! the crawler keeps its own seen-set per folder traversal and stops on
//! either an absent `next` pointer or a page that yields zero new
//! records, whichever comes first.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, ApiError, FolderRecord};
use crate::store::{Book, ContentStore, Folder, Language, Paragraph, StoreError};

/// Default page size for offset pagination.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Crawl tuning knobs.
#[derive(Debug, Clone)]
pub struct CrawlOptions {
    /// Restrict the crawl to these language codes; `None` crawls all.
    pub languages: Option<Vec<String>>,
    /// Also fetch book content (TOC + chapter paragraphs).
    pub download_content: bool,
    /// Cap on books fetched per folder, for bounded sampling runs.
    /// Stops that folder early without affecting siblings.
    pub max_books_per_folder: Option<u32>,
    /// Books requested per page.
    pub page_size: u32,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            languages: None,
            download_content: false,
            max_books_per_folder: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A subtree the crawl skipped, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedSubtree {
    /// What was skipped, e.g. `language en` or `folder 42`.
    pub scope: String,
    /// Why.
    pub reason: String,
}

/// Final crawl report. A crawl reports counts and skip reasons rather
/// than a bare success/failure.
#[derive(Debug, Default)]
pub struct CrawlSummary {
    /// Languages visited.
    pub languages: u64,
    /// Folders visited.
    pub folders: u64,
    /// Books upserted.
    pub books_inserted: u64,
    /// Paragraphs upserted (only when content download was requested).
    pub paragraphs_inserted: u64,
    /// Duplicate records dropped. Expected, not an error.
    pub duplicates_dropped: u64,
    /// Subtrees skipped after contained failures.
    pub skipped: Vec<SkippedSubtree>,
    /// Whether the crawl stopped on a cancellation request.
    pub cancelled: bool,
}

/// Errors that abort an entire crawl. Folder- and book-level failures
/// never appear here; they are contained and reported in the summary.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// Token acquisition or rejection; no point continuing.
    #[error(transparent)]
    Api(ApiError),

    /// Store write failure (connection granularity).
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Walks the remote catalog into the content store.
///
/// Single-threaded by design: remote calls are sequenced so the client's
/// constant inter-request delay acts as a global rate limit, and pages
/// within one folder are fetched in increasing offset order, which the
/// duplicate detection depends on.
pub struct Crawler<'a> {
    api: &'a ApiClient,
    store: &'a ContentStore,
    options: CrawlOptions,
    cancel: Arc<AtomicBool>,
}

impl<'a> Crawler<'a> {
    /// Creates a crawler over an API client and a content store.
    #[must_use]
    pub fn new(api: &'a ApiClient, store: &'a ContentStore, options: CrawlOptions) -> Self {
        Self {
            api,
            store,
            options,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the cooperative cancellation flag. Setting it stops the
    /// crawl at the next page/paragraph boundary; partially ingested
    /// folders remain valid (missing data, not corrupt data).
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Runs the crawl to completion (or cancellation) and returns the
    /// summary.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError`] only for failures at token or store
    /// granularity, or when the initial language enumeration fails.
    /// A single remote error inside one subtree never aborts the crawl.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<CrawlSummary, CrawlError> {
        let mut summary = CrawlSummary::default();

        let languages = self.api.languages().await.map_err(CrawlError::Api)?;
        info!(languages = languages.len(), "catalog languages enumerated");

        for record in languages {
            if self.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            if let Some(wanted) = &self.options.languages
                && !wanted.iter().any(|code| code == &record.code)
            {
                continue;
            }

            let code = record.code.clone();
            self.store
                .upsert_language(&Language::from(record))
                .await?;
            summary.languages += 1;

            match self.api.folders(&code).await {
                Ok(folders) => {
                    self.crawl_folder_tree(&code, folders, &mut summary)
                        .await?;
                }
                Err(err) if err.is_fatal() => return Err(CrawlError::Api(err)),
                Err(err) => {
                    warn!(language = %code, error = %err, "language subtree skipped");
                    summary.skipped.push(SkippedSubtree {
                        scope: format!("language {code}"),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            languages = summary.languages,
            folders = summary.folders,
            books = summary.books_inserted,
            paragraphs = summary.paragraphs_inserted,
            duplicates = summary.duplicates_dropped,
            skipped = summary.skipped.len(),
            cancelled = summary.cancelled,
            "crawl finished"
        );
        Ok(summary)
    }

    /// Depth-first walk over a language's folder tree.
    async fn crawl_folder_tree(
        &self,
        language_code: &str,
        roots: Vec<FolderRecord>,
        summary: &mut CrawlSummary,
    ) -> Result<(), CrawlError> {
        // Explicit stack; children pushed in reverse for left-to-right
        // depth-first order.
        let mut stack: Vec<FolderRecord> = roots.into_iter().rev().collect();

        while let Some(folder) = stack.pop() {
            if self.is_cancelled() {
                summary.cancelled = true;
                return Ok(());
            }

            self.store.upsert_folder(&Folder::from(&folder)).await?;
            summary.folders += 1;

            if folder.book_count > 0 {
                self.crawl_folder_books(language_code, &folder, summary)
                    .await?;
            } else {
                debug!(folder_id = folder.folder_id, "pure grouping node");
            }

            for child in folder.children.into_iter().rev() {
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Paginated book fetch for one folder, with duplicate elimination.
    async fn crawl_folder_books(
        &self,
        language_code: &str,
        folder: &FolderRecord,
        summary: &mut CrawlSummary,
    ) -> Result<(), CrawlError> {
        let folder_id = folder.folder_id;
        // Seen-set is scoped to this folder traversal only.
        let mut seen: HashSet<i64> = HashSet::new();
        let mut offset: u32 = 0;
        let mut accepted: u32 = 0;

        loop {
            if self.is_cancelled() {
                summary.cancelled = true;
                return Ok(());
            }

            let page = match self
                .api
                .books_by_folder(folder_id, self.options.page_size, offset)
                .await
            {
                Ok(page) => page,
                Err(err) if err.is_fatal() => return Err(CrawlError::Api(err)),
                Err(err) => {
                    warn!(folder_id, error = %err, "folder subtree skipped");
                    summary.skipped.push(SkippedSubtree {
                        scope: format!("folder {folder_id}"),
                        reason: err.to_string(),
                    });
                    return Ok(());
                }
            };

            let has_next = page.has_next();
            let records = page.into_items();
            let fetched = records.len();
            let mut new_in_page: usize = 0;

            for mut record in records {
                if !seen.insert(record.book_id) {
                    // Observed in practice: the API repeats records
                    // across pages. Count and drop.
                    summary.duplicates_dropped += 1;
                    continue;
                }
                new_in_page += 1;

                if record.language_code.is_empty() {
                    record.language_code = language_code.to_string();
                }
                let book = Book::from_record(record, Some(folder_id));
                let book_id = book.book_id;
                self.store.upsert_book(&book).await?;
                summary.books_inserted += 1;
                accepted += 1;

                if self.options.download_content {
                    self.ingest_book_content(book_id, summary).await?;
                }

                if let Some(cap) = self.options.max_books_per_folder
                    && accepted >= cap
                {
                    debug!(folder_id, cap, "folder book cap reached");
                    return Ok(());
                }
                if self.is_cancelled() {
                    summary.cancelled = true;
                    return Ok(());
                }
            }

            // Two independent termination bounds: the API's own next
            // pointer, and a no-progress page. The next pointer alone has
            // been observed to loop.
            if !has_next || new_in_page == 0 || fetched == 0 {
                break;
            }
            offset += fetched as u32;
        }

        debug!(
            folder_id,
            unique = seen.len(),
            "folder pagination complete"
        );
        Ok(())
    }

    /// Fetches a book's TOC and chapter paragraphs. Failures here are
    /// contained at book granularity.
    async fn ingest_book_content(
        &self,
        book_id: i64,
        summary: &mut CrawlSummary,
    ) -> Result<(), CrawlError> {
        let chapters = match self.api.book_toc(book_id).await {
            Ok(chapters) => chapters,
            Err(err) if err.is_fatal() => return Err(CrawlError::Api(err)),
            Err(err) => {
                warn!(book_id, error = %err, "book content skipped");
                summary.skipped.push(SkippedSubtree {
                    scope: format!("book {book_id}"),
                    reason: err.to_string(),
                });
                return Ok(());
            }
        };

        let mut para_order: i64 = 1;
        for chapter in chapters {
            if self.is_cancelled() {
                summary.cancelled = true;
                return Ok(());
            }

            let records = match self
                .api
                .chapter_paragraphs(book_id, &chapter.chapter_id)
                .await
            {
                Ok(records) => records,
                Err(err) if err.is_fatal() => return Err(CrawlError::Api(err)),
                Err(err) => {
                    warn!(book_id, chapter = %chapter.chapter_id, error = %err, "chapter skipped");
                    summary.skipped.push(SkippedSubtree {
                        scope: format!("book {book_id} chapter {}", chapter.chapter_id),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            for record in records {
                let paragraph = Paragraph::from_record(record, book_id, para_order);
                self.store.upsert_paragraph(&paragraph).await?;
                para_order += 1;
                summary.paragraphs_inserted += 1;
            }
        }
        Ok(())
    }
}
