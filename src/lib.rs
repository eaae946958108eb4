//! Scriptorium Core Library
//!
//! This library provides the core functionality for the scriptorium
//! tool, which mirrors a remote writings catalog into a searchable local
//! store and renders books into paginated, citable documents.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`auth`] - OAuth token lifecycle and persistence
//! - [`api`] - Authenticated catalog API client with request pacing
//! - [`crawler`] - Catalog traversal with duplicate elimination
//! - [`store`] - SQLite content store with full-text search
//! - [`render`] - Pagination, table of contents, citation anchors
//! - [`db`] - Database connection and schema management
//! - [`config`] - Settings file and environment overrides

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod config;
pub mod crawler;
pub mod db;
pub mod render;
pub mod store;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, DelayClass, RequestPacer};
pub use auth::{AuthError, TokenManager, TokenStatus};
pub use config::{ConfigError, Settings};
pub use crawler::{CrawlError, CrawlOptions, CrawlSummary, Crawler};
pub use db::Database;
pub use render::{DocumentRenderer, RenderError, RenderOptions, RenderedDocument};
pub use store::{ContentStore, SearchResults, StoreError};
