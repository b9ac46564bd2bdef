//! # Item Search
//!
//! Demonstration harness for the item search client. It wires an
//! [`ItemRepository`](item_search_repository::ItemRepository) to a live
//! OpenSearch or Elasticsearch cluster and walks through the supported
//! operations: saving, sorted listing, range and match queries, paging and
//! aggregations.
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`demo`]: The demonstration scenarios

pub mod config;
pub mod demo;

pub use config::Dependencies;
pub use demo::DemoRunner;

use item_search_repository::SearchIndexError;
use item_search_shared::QueryBuildError;
use thiserror::Error;

/// Errors that can occur during start-up or while running the demo.
#[derive(Error, Debug)]
pub enum DemoError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchIndexError),
}

impl DemoError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

impl From<QueryBuildError> for DemoError {
    fn from(err: QueryBuildError) -> Self {
        Self::SearchError(err.into())
    }
}
