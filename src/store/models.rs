//! Catalog entity models as stored locally.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::api::{BookRecord, FolderRecord, LanguageRecord, ParagraphRecord};

/// Reading direction of a language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDirection {
    /// Left to right.
    Ltr,
    /// Right to left.
    Rtl,
}

impl TextDirection {
    /// Stored string form.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ltr => "ltr",
            Self::Rtl => "rtl",
        }
    }

    /// Parses the stored/remote string form; anything unrecognized is `ltr`.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("rtl") {
            Self::Rtl
        } else {
            Self::Ltr
        }
    }
}

/// A catalog language.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    /// Unique language code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Reading direction.
    pub text_direction: TextDirection,
}

impl From<LanguageRecord> for Language {
    fn from(record: LanguageRecord) -> Self {
        Self {
            text_direction: record
                .direction
                .as_deref()
                .map_or(TextDirection::Ltr, TextDirection::parse),
            code: record.code,
            name: record.name,
        }
    }
}

/// A folder in the catalog tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder id.
    pub folder_id: i64,
    /// Folder name.
    pub name: String,
    /// Parent folder, absent for roots.
    pub parent_id: Option<i64>,
    /// Direct book count as reported by the remote catalog.
    pub book_count: i64,
}

impl From<&FolderRecord> for Folder {
    fn from(record: &FolderRecord) -> Self {
        Self {
            folder_id: record.folder_id,
            name: record.name.clone(),
            parent_id: record.parent_id,
            book_count: record.book_count,
        }
    }
}

/// A book, including its denormalized categorization.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    /// Globally unique book id. Re-ingestion overwrites, never duplicates.
    pub book_id: i64,
    /// Short book code.
    pub code: String,
    /// Language code.
    pub language_code: String,
    /// Folder the book was listed under.
    pub folder_id: Option<i64>,
    /// Title.
    pub title: String,
    /// Author.
    pub author: String,
    /// Publication year when known.
    pub publication_year: Option<i64>,
    /// Printed page count when known.
    pub page_count: Option<i64>,
    /// Coarse type from the remote catalog.
    pub book_type: String,
    /// Finer subtype when present.
    pub subtype: Option<String>,
    /// Archive download URL when present.
    pub download_url: Option<String>,
    /// Derived category (denormalized, recomputable).
    pub category: String,
    /// Derived subcategory (denormalized, recomputable).
    pub subcategory: String,
}

impl Book {
    /// Builds a book from a wire record, computing its categorization.
    /// The folder id falls back to the folder the record was fetched
    /// under when the record itself omits one.
    #[must_use]
    pub fn from_record(record: BookRecord, listed_under: Option<i64>) -> Self {
        let categorization = super::categorize(
            &record.author,
            &record.title,
            &record.book_type,
            &record.code,
        );
        Self {
            book_id: record.book_id,
            code: record.code,
            language_code: record.language_code,
            folder_id: record.folder_id.or(listed_under),
            title: record.title,
            author: record.author,
            publication_year: record.publication_year,
            page_count: record.page_count,
            book_type: record.book_type,
            subtype: record.subtype,
            download_url: record.download_url,
            category: categorization.category.to_string(),
            subcategory: categorization.subcategory.to_string(),
        }
    }
}

/// A paragraph of book content.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Paragraph {
    /// Book the paragraph belongs to.
    pub book_id: i64,
    /// Paragraph id, unique within the book.
    pub para_id: String,
    /// Previous paragraph in reading order.
    pub prev_id: Option<String>,
    /// Next paragraph in reading order.
    pub next_id: Option<String>,
    /// Short citation refcode.
    pub refcode_short: String,
    /// Long citation refcode.
    pub refcode_long: String,
    /// Element type; heading types start chapters.
    pub element_type: String,
    /// Rich (HTML) content.
    pub content: String,
    /// Monotonic order within the book, consistent with prev/next.
    pub para_order: i64,
}

impl Paragraph {
    /// Builds a paragraph from a wire record at a given order position.
    #[must_use]
    pub fn from_record(record: ParagraphRecord, book_id: i64, para_order: i64) -> Self {
        Self {
            book_id,
            para_id: record.para_id,
            prev_id: record.prev_id,
            next_id: record.next_id,
            refcode_short: record.refcode_short,
            refcode_long: record.refcode_long,
            element_type: record.element_type,
            content: record.content,
            para_order,
        }
    }
}

/// Consistent catalog counts.
///
/// `downloaded_books` counts only books with at least one persisted
/// paragraph, not mere catalog entries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CatalogStats {
    /// Number of languages.
    pub languages: i64,
    /// Number of folders.
    pub folders: i64,
    /// Number of catalog books.
    pub books: i64,
    /// Number of books with downloaded content.
    pub downloaded_books: i64,
    /// Number of paragraphs.
    pub paragraphs: i64,
}

/// One ranked full-text match.
#[derive(Debug, Clone, FromRow)]
pub struct SearchHit {
    /// Book the hit belongs to.
    pub book_id: i64,
    /// Paragraph id of the hit.
    pub para_id: String,
    /// Short citation refcode.
    pub refcode_short: String,
    /// Matching paragraph content.
    pub content: String,
    /// Paragraph order, the stable tie-break key.
    pub para_order: i64,
    /// Rank score; lower is better, monotone over result position.
    pub rank: f64,
}

/// A page of search results plus the total match count.
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// Total matches for the query, independent of paging.
    pub total: i64,
    /// Hits for the requested page.
    pub hits: Vec<SearchHit>,
}
