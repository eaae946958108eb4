//! Wire types for remote API responses.
//!
//! The remote service has been observed to return list endpoints in two
//! shapes: a paginated envelope (`count`/`next`/`results`) and a bare
//! array. [`MaybePaged`] validates both at the client boundary so the
//! rest of the crate never duck-types a response.

use serde::Deserialize;

/// A language entry from `GET /content/languages`.
#[derive(Debug, Clone, Deserialize)]
pub struct LanguageRecord {
    /// Unique language code, e.g. `en`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// `ltr` or `rtl`; absent means `ltr`.
    #[serde(default)]
    pub direction: Option<String>,
}

/// A folder entry from `GET /content/languages/{lang}/folders`.
///
/// Folders nest; children are walked depth-first by the crawler.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderRecord {
    /// Unique folder id.
    pub folder_id: i64,
    /// Folder name.
    pub name: String,
    /// Parent folder, absent for roots.
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Direct (non-recursive) book count. Zero with children present
    /// means a pure grouping node.
    #[serde(default)]
    pub book_count: i64,
    /// Nested children.
    #[serde(default)]
    pub children: Vec<FolderRecord>,
}

/// A book entry from the catalog endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct BookRecord {
    /// Globally unique book id.
    pub book_id: i64,
    /// Short book code, e.g. `DA`.
    #[serde(default)]
    pub code: String,
    /// Language the book belongs to.
    #[serde(default, alias = "lang")]
    pub language_code: String,
    /// Folder the book was listed under.
    #[serde(default)]
    pub folder_id: Option<i64>,
    /// Title.
    pub title: String,
    /// Author, may be empty for compilations.
    #[serde(default)]
    pub author: String,
    /// Publication year when known.
    #[serde(default, alias = "pub_year")]
    pub publication_year: Option<i64>,
    /// Printed page count when known.
    #[serde(default, alias = "npages")]
    pub page_count: Option<i64>,
    /// Coarse type, e.g. `book`, `periodical`, `manuscript`, `bible`.
    #[serde(default, alias = "type")]
    pub book_type: String,
    /// Finer subtype when the API provides one.
    #[serde(default)]
    pub subtype: Option<String>,
    /// Archive download URL when the book has one.
    #[serde(default, alias = "download")]
    pub download_url: Option<String>,
}

/// A chapter entry from `GET /content/books/{id}/toc`.
#[derive(Debug, Clone, Deserialize)]
pub struct ChapterRecord {
    /// Chapter id used by the chapter-paragraphs endpoint.
    #[serde(alias = "id")]
    pub chapter_id: String,
    /// Chapter title when the API provides one.
    #[serde(default)]
    pub title: Option<String>,
}

/// A paragraph entry from `GET /content/books/{id}/chapter/{chapterId}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ParagraphRecord {
    /// Paragraph id, unique within its book.
    pub para_id: String,
    /// Previous paragraph in reading order.
    #[serde(default, alias = "id_prev")]
    pub prev_id: Option<String>,
    /// Next paragraph in reading order.
    #[serde(default, alias = "id_next")]
    pub next_id: Option<String>,
    /// Short citation refcode.
    #[serde(default)]
    pub refcode_short: String,
    /// Long citation refcode.
    #[serde(default)]
    pub refcode_long: String,
    /// Element type, e.g. `paragraph`, `heading`, `chapter-title`.
    #[serde(default)]
    pub element_type: String,
    /// Rich (HTML) content.
    #[serde(default)]
    pub content: String,
}

/// A hit from the remote `GET /search` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHitRecord {
    /// Book the hit belongs to.
    pub book_id: i64,
    /// Paragraph id of the hit.
    pub para_id: String,
    /// Matching snippet.
    #[serde(default)]
    pub snippet: String,
}

/// The paginated list envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PagedResponse<T> {
    /// Reported total. Observed to disagree with reality; informational
    /// only, never a loop bound.
    #[serde(default)]
    pub count: Option<i64>,
    /// Opaque next-page pointer; absent on the last page.
    #[serde(default)]
    pub next: Option<String>,
    /// Items on this page.
    ///
    /// The explicit `Vec::new` default keeps the derive from demanding
    /// `T: Default` on the record types.
    #[serde(default = "Vec::new", alias = "results")]
    pub items: Vec<T>,
}

/// A list response in either of the two observed shapes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybePaged<T> {
    /// The paginated envelope.
    Paged(PagedResponse<T>),
    /// A bare array (implicitly the only page).
    Bare(Vec<T>),
}

impl<T> MaybePaged<T> {
    /// Consumes the response, returning its items.
    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Paged(page) => page.items,
            Self::Bare(items) => items,
        }
    }

    /// Whether the API reports a further page. Bare arrays never do.
    #[must_use]
    pub fn has_next(&self) -> bool {
        match self {
            Self::Paged(page) => page.next.is_some(),
            Self::Bare(_) => false,
        }
    }

    /// The reported total, when the envelope carries one.
    #[must_use]
    pub fn count(&self) -> Option<i64> {
        match self {
            Self::Paged(page) => page.count,
            Self::Bare(_) => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_maybe_paged_decodes_envelope() {
        let json = r#"{"count": 12, "next": "?offset=2", "results": [
            {"book_id": 1, "title": "A"},
            {"book_id": 2, "title": "B"}
        ]}"#;
        let page: MaybePaged<BookRecord> = serde_json::from_str(json).unwrap();
        assert!(page.has_next());
        assert_eq!(page.count(), Some(12));
        assert_eq!(page.into_items().len(), 2);
    }

    #[test]
    fn test_paged_envelope_without_results_defaults_to_empty() {
        // Record types do not implement Default; only the item vector may
        // default when the envelope omits it.
        let json = r#"{"count": 0}"#;
        let page: MaybePaged<BookRecord> = serde_json::from_str(json).unwrap();
        assert!(!page.has_next());
        assert!(page.into_items().is_empty());
    }

    #[test]
    fn test_maybe_paged_decodes_bare_array() {
        let json = r#"[{"book_id": 3, "title": "C"}]"#;
        let page: MaybePaged<BookRecord> = serde_json::from_str(json).unwrap();
        assert!(!page.has_next());
        assert_eq!(page.count(), None);
        assert_eq!(page.into_items().len(), 1);
    }

    #[test]
    fn test_book_record_accepts_aliases() {
        let json = r#"{
            "book_id": 9,
            "code": "DA",
            "lang": "en",
            "title": "The Desire of Ages",
            "author": "White, E.",
            "pub_year": 1898,
            "npages": 835,
            "type": "book",
            "download": "https://api.test/content/books/9/download"
        }"#;
        let book: BookRecord = serde_json::from_str(json).unwrap();
        assert_eq!(book.language_code, "en");
        assert_eq!(book.publication_year, Some(1898));
        assert_eq!(book.page_count, Some(835));
        assert_eq!(book.book_type, "book");
        assert!(book.download_url.is_some());
    }

    #[test]
    fn test_folder_record_nested_children() {
        let json = r#"{
            "folder_id": 1, "name": "Books", "book_count": 0,
            "children": [
                {"folder_id": 2, "name": "Early", "parent_id": 1, "book_count": 4, "children": []}
            ]
        }"#;
        let folder: FolderRecord = serde_json::from_str(json).unwrap();
        assert_eq!(folder.children.len(), 1);
        assert_eq!(folder.children[0].parent_id, Some(1));
    }
}
