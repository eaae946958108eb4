//! Flat JSON catalog snapshot for read-only consumers.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, instrument};

use super::models::{Book, CatalogStats, Folder, Language};
use super::store::{ContentStore, StoreError};

/// The exported snapshot shape.
#[derive(Debug, Serialize)]
pub struct CatalogSnapshot {
    /// All languages.
    pub languages: Vec<Language>,
    /// All folders.
    pub folders: Vec<Folder>,
    /// All books.
    pub books: Vec<Book>,
    /// Counts at export time.
    pub stats: CatalogStats,
}

/// Errors during export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Reading the catalog failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Writing the snapshot file failed.
    #[error("failed to write snapshot {path}: {source}")]
    Io {
        /// Snapshot path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Serializing the snapshot failed.
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Batch size for paging books out of the store.
const EXPORT_PAGE: i64 = 500;

/// Exports the whole catalog (languages, folders, books, stats) as one
/// JSON file. Paragraph content is not included; consumers needing text
/// query the store directly.
///
/// # Errors
///
/// Returns [`ExportError`] on read, serialize, or write failure.
#[instrument(skip(store, path), fields(path = %path.display()))]
pub async fn export_catalog(store: &ContentStore, path: &Path) -> Result<(), ExportError> {
    let languages = store.languages().await?;
    let folders = store.folders().await?;

    let mut books = Vec::new();
    let mut offset = 0;
    loop {
        let page = store.list_books(None, None, EXPORT_PAGE, offset).await?;
        let fetched = page.len() as i64;
        books.extend(page);
        if fetched < EXPORT_PAGE {
            break;
        }
        offset += fetched;
    }

    let stats = store.stats().await?;
    let snapshot = CatalogSnapshot {
        languages,
        folders,
        books,
        stats,
    };

    let raw = serde_json::to_string_pretty(&snapshot)?;
    std::fs::write(path, raw).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        books = snapshot.books.len(),
        languages = snapshot.languages.len(),
        "catalog snapshot exported"
    );
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::models::TextDirection;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_export_writes_readable_snapshot() {
        let store = ContentStore::in_memory().await.unwrap();
        store
            .upsert_language(&Language {
                code: "en".to_string(),
                name: "English".to_string(),
                text_direction: TextDirection::Ltr,
            })
            .await
            .unwrap();

        let temp = TempDir::new().unwrap();
        let path = temp.path().join("catalog.json");
        export_catalog(&store, &path).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["languages"][0]["code"], "en");
        assert_eq!(value["stats"]["languages"], 1);
    }
}
