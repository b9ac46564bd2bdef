//! Search index error types.
//!
//! This module defines the unified error type for all search index operations,
//! including local validation failures, transport failures and engine rejections.

use item_search_shared::QueryBuildError;
use thiserror::Error;

use crate::types::BulkItemFailure;

/// Unified errors from search index operations.
///
/// Used by the `SearchIndexProvider` trait and `ItemRepository` for all search index
/// operations. `InvalidQuery` and `BatchSizeExceeded` are raised before any request
/// is sent; the others describe what the engine or transport reported.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// The query descriptor is invalid (empty field, inverted range, zero page size).
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryBuildError),

    /// The search engine could not be reached or failed to answer.
    #[error("Search unavailable: {0}")]
    SearchUnavailable(String),

    /// The search engine rejected the translated query.
    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    /// Failed to set up the client connection.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to index a document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Some documents of a bulk save failed; the rest were indexed.
    #[error("Bulk save failed for {failed} of {total} documents")]
    PartialBulkFailure {
        total: usize,
        failed: usize,
        failures: Vec<BulkItemFailure>,
    },

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to create the search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse response from search index backend.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Failed to serialize data for the search index backend.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },

    /// Unknown error.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl SearchIndexError {
    /// Create a search unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::SearchUnavailable(msg.into())
    }

    /// Create a query syntax error.
    pub fn query_syntax(msg: impl Into<String>) -> Self {
        Self::QuerySyntax(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a partial bulk failure error.
    pub fn partial_bulk_failure(total: usize, failures: Vec<BulkItemFailure>) -> Self {
        Self::PartialBulkFailure {
            total,
            failed: failures.len(),
            failures,
        }
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Create an unknown error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}
