//! # Item Search Repository
//!
//! This crate provides the typed repository used to store and query item
//! documents. It includes definitions for errors, the provider interface, and a
//! concrete provider for OpenSearch and Elasticsearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod service;
pub mod types;
pub mod utils;

pub use config::RepositoryConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use opensearch::OpenSearchProvider;
pub use service::ItemRepository;
pub use types::{BatchOperationResult, BatchOperationSummary, BulkItemFailure};
