//! Authenticated, rate-limited access to the remote writings API.
//!
//! [`ApiClient`] wraps every remote call with bearer-token injection,
//! a constant inter-request delay, and uniform error translation.

mod client;
mod error;
mod pacer;
mod types;

pub use client::ApiClient;
pub use error::ApiError;
pub use pacer::{DelayClass, RequestPacer};
pub use types::{
    BookRecord, ChapterRecord, FolderRecord, LanguageRecord, MaybePaged, PagedResponse,
    ParagraphRecord, SearchHitRecord,
};
