//! OpenSearch implementation of the search index provider.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch (or Elasticsearch 7+) as the backend.

mod index_config;
mod provider;
pub mod query_dsl;
pub mod response;

pub use index_config::{get_index_settings, IndexConfig, INDEX_NAME};
pub use provider::OpenSearchProvider;
