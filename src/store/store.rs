//! The content store: idempotent catalog writes, ordered paragraph
//! reads, full-text search, and consistent statistics.
//!
//! The store is an explicitly constructed service with an `open`/`close`
//! lifecycle, injected into the crawler and the renderer. Each upsert is
//! a single statement, so readers never observe a half-written entity.

use std::path::Path;

use thiserror::Error;
use tracing::instrument;

use super::models::{Book, CatalogStats, Folder, Language, Paragraph, SearchHit, SearchResults};
use crate::db::{Database, DbError};

/// Store-level errors. Write conflicts never appear here: upserts are
/// last-write-wins by construction.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query execution failure.
    #[error("store query failed: {0}")]
    Query(#[from] sqlx::Error),

    /// Connection/migration failure. Aborts the run.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Durable catalog store backed by SQLite.
#[derive(Debug, Clone)]
pub struct ContentStore {
    db: Database,
}

impl ContentStore {
    /// Opens (or creates) the store at a path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on connection or migration failure.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::new(path).await?,
        })
    }

    /// Opens an in-memory store (tests, dry runs).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Db`] on connection or migration failure.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            db: Database::new_in_memory().await?,
        })
    }

    /// Closes the store. The instance must not be used afterwards.
    pub async fn close(self) {
        self.db.close().await;
    }

    /// Upserts a language, keyed by code.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    #[instrument(skip(self, language), fields(code = %language.code))]
    pub async fn upsert_language(&self, language: &Language) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO languages (code, name, text_direction) VALUES (?1, ?2, ?3)
             ON CONFLICT(code) DO UPDATE SET
                name = excluded.name,
                text_direction = excluded.text_direction",
        )
        .bind(&language.code)
        .bind(&language.name)
        .bind(language.text_direction.as_str())
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Upserts a folder, keyed by folder id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    #[instrument(skip(self, folder), fields(folder_id = folder.folder_id))]
    pub async fn upsert_folder(&self, folder: &Folder) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO folders (folder_id, name, parent_id, book_count) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(folder_id) DO UPDATE SET
                name = excluded.name,
                parent_id = excluded.parent_id,
                book_count = excluded.book_count",
        )
        .bind(folder.folder_id)
        .bind(&folder.name)
        .bind(folder.parent_id)
        .bind(folder.book_count)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Upserts a book, keyed by book id (insert-or-replace semantics).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    #[instrument(skip(self, book), fields(book_id = book.book_id))]
    pub async fn upsert_book(&self, book: &Book) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO books (book_id, code, language_code, folder_id, title, author,
                                publication_year, page_count, book_type, subtype,
                                download_url, category, subcategory)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(book_id) DO UPDATE SET
                code = excluded.code,
                language_code = excluded.language_code,
                folder_id = excluded.folder_id,
                title = excluded.title,
                author = excluded.author,
                publication_year = excluded.publication_year,
                page_count = excluded.page_count,
                book_type = excluded.book_type,
                subtype = excluded.subtype,
                download_url = excluded.download_url,
                category = excluded.category,
                subcategory = excluded.subcategory",
        )
        .bind(book.book_id)
        .bind(&book.code)
        .bind(&book.language_code)
        .bind(book.folder_id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(book.publication_year)
        .bind(book.page_count)
        .bind(&book.book_type)
        .bind(&book.subtype)
        .bind(&book.download_url)
        .bind(&book.category)
        .bind(&book.subcategory)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Upserts a paragraph, keyed by (book id, paragraph id).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    #[instrument(skip(self, paragraph), fields(book_id = paragraph.book_id, para_id = %paragraph.para_id))]
    pub async fn upsert_paragraph(&self, paragraph: &Paragraph) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO paragraphs (book_id, para_id, prev_id, next_id, refcode_short,
                                     refcode_long, element_type, content, para_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(book_id, para_id) DO UPDATE SET
                prev_id = excluded.prev_id,
                next_id = excluded.next_id,
                refcode_short = excluded.refcode_short,
                refcode_long = excluded.refcode_long,
                element_type = excluded.element_type,
                content = excluded.content,
                para_order = excluded.para_order",
        )
        .bind(paragraph.book_id)
        .bind(&paragraph.para_id)
        .bind(&paragraph.prev_id)
        .bind(&paragraph.next_id)
        .bind(&paragraph.refcode_short)
        .bind(&paragraph.refcode_long)
        .bind(&paragraph.element_type)
        .bind(&paragraph.content)
        .bind(paragraph.para_order)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Fetches a book by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    pub async fn get_book(&self, book_id: i64) -> Result<Option<Book>, StoreError> {
        let book = sqlx::query_as::<_, Book>("SELECT * FROM books WHERE book_id = ?1")
            .bind(book_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(book)
    }

    /// Lists books, optionally filtered by language and/or folder,
    /// ordered by book id for stable paging.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    #[instrument(skip(self))]
    pub async fn list_books(
        &self,
        language_code: Option<&str>,
        folder_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Book>, StoreError> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT * FROM books
             WHERE (?1 IS NULL OR language_code = ?1)
               AND (?2 IS NULL OR folder_id = ?2)
             ORDER BY book_id
             LIMIT ?3 OFFSET ?4",
        )
        .bind(language_code)
        .bind(folder_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;
        Ok(books)
    }

    /// Returns paragraphs of a book in `para_order`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    #[instrument(skip(self))]
    pub async fn get_paragraphs(
        &self,
        book_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Paragraph>, StoreError> {
        let paragraphs = sqlx::query_as::<_, Paragraph>(
            "SELECT * FROM paragraphs WHERE book_id = ?1
             ORDER BY para_order LIMIT ?2 OFFSET ?3",
        )
        .bind(book_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;
        Ok(paragraphs)
    }

    /// Returns all paragraphs of a book in `para_order`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    pub async fn get_all_paragraphs(&self, book_id: i64) -> Result<Vec<Paragraph>, StoreError> {
        let paragraphs = sqlx::query_as::<_, Paragraph>(
            "SELECT * FROM paragraphs WHERE book_id = ?1 ORDER BY para_order",
        )
        .bind(book_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(paragraphs)
    }

    /// Ranked full-text search over paragraph content.
    ///
    /// Rank is FTS5 `bm25()` (monotone over result position); ties break
    /// by `(book_id, para_order)` so pagination stays stable across
    /// repeated calls with the same query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<SearchResults, StoreError> {
        let match_expr = fts_quote(query);
        if match_expr.is_empty() {
            return Ok(SearchResults {
                total: 0,
                hits: Vec::new(),
            });
        }

        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM paragraphs_fts WHERE paragraphs_fts MATCH ?1")
                .bind(&match_expr)
                .fetch_one(self.db.pool())
                .await?;

        let hits = sqlx::query_as::<_, SearchHit>(
            "SELECT p.book_id, p.para_id, p.refcode_short, p.content, p.para_order,
                    bm25(paragraphs_fts) AS rank
             FROM paragraphs_fts
             JOIN paragraphs p ON p.rowid = paragraphs_fts.rowid
             WHERE paragraphs_fts MATCH ?1
             ORDER BY rank, p.book_id, p.para_order
             LIMIT ?2 OFFSET ?3",
        )
        .bind(&match_expr)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.pool())
        .await?;

        Ok(SearchResults { total, hits })
    }

    /// Lists all languages.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    pub async fn languages(&self) -> Result<Vec<Language>, StoreError> {
        let rows: Vec<(String, String, String)> =
            sqlx::query_as("SELECT code, name, text_direction FROM languages ORDER BY code")
                .fetch_all(self.db.pool())
                .await?;
        Ok(rows
            .into_iter()
            .map(|(code, name, direction)| Language {
                code,
                name,
                text_direction: super::models::TextDirection::parse(&direction),
            })
            .collect())
    }

    /// Lists all folders.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    pub async fn folders(&self) -> Result<Vec<Folder>, StoreError> {
        let folders = sqlx::query_as::<_, Folder>("SELECT * FROM folders ORDER BY folder_id")
            .fetch_all(self.db.pool())
            .await?;
        Ok(folders)
    }

    /// Consistent catalog statistics.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Query`] on execution failure.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<CatalogStats, StoreError> {
        let (languages,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM languages")
            .fetch_one(self.db.pool())
            .await?;
        let (folders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM folders")
            .fetch_one(self.db.pool())
            .await?;
        let (books,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM books")
            .fetch_one(self.db.pool())
            .await?;
        let (downloaded_books,): (i64,) =
            sqlx::query_as("SELECT COUNT(DISTINCT book_id) FROM paragraphs")
                .fetch_one(self.db.pool())
                .await?;
        let (paragraphs,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM paragraphs")
            .fetch_one(self.db.pool())
            .await?;

        Ok(CatalogStats {
            languages,
            folders,
            books,
            downloaded_books,
            paragraphs,
        })
    }
}

/// Quotes a user query for FTS5: each whitespace token becomes a quoted
/// phrase, so FTS syntax characters in user input cannot break the match
/// expression.
fn fts_quote(query: &str) -> String {
    query
        .split_whitespace()
        .map(|token| format!("\"{}\"", token.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(" ")
}
