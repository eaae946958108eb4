//! Durable, queryable catalog of languages, folders, books, and
//! paragraphs, with derived categorization and full-text search.

mod category;
mod export;
mod models;
#[allow(clippy::module_inception)]
mod store;

pub use category::{Categorization, categorize};
pub use export::{CatalogSnapshot, ExportError, export_catalog};
pub use models::{
    Book, CatalogStats, Folder, Language, Paragraph, SearchHit, SearchResults, TextDirection,
};
pub use store::{ContentStore, StoreError};
