//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use async_trait::async_trait;
use item_search_shared::{ItemDocument, ResultPage, SearchRequest};

use crate::errors::SearchIndexError;
use crate::types::BatchOperationSummary;

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// This trait defines the interface for all search index backend implementations. Implementations
/// are passed to `ItemRepository` explicitly at construction, which also makes it easy to test
/// the repository against mock implementations.
///
/// Every call is a single stateless request/response; no session or transaction spans calls.
/// All methods return `Result<T, SearchIndexError>` for consistent error handling across
/// different backend implementations.
///
/// # Index Initialization
///
/// Implementations should call `ensure_index_exists` during application startup to ensure
/// the search index and any aliases are properly configured before performing document operations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the search index and any required aliases exist, creating them if necessary.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index is ready for use
    /// * `Err(SearchIndexError)` - If initialization fails
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError>;

    /// Index a single document, replacing any document with the same id (upsert).
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was stored
    /// * `Err(SearchIndexError::SearchUnavailable)` - If the engine could not be reached
    /// * `Err(SearchIndexError)` - If the engine rejected the document
    async fn index_document(&self, document: &ItemDocument) -> Result<(), SearchIndexError>;

    /// Index multiple documents and return a summary of successful and failed operations.
    ///
    /// A failing document never aborts the remainder of the batch; each one gets its own
    /// result in the summary. Atomicity is whatever the engine provides.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Contains aggregate statistics and individual results
    /// * `Err(SearchIndexError)` - If the bulk request as a whole could not be executed
    async fn bulk_index_documents(
        &self,
        documents: &[ItemDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Execute a search request and return one page of results.
    ///
    /// # Returns
    ///
    /// * `Ok(ResultPage)` - The requested page plus aggregation results
    /// * `Err(SearchIndexError::SearchUnavailable)` - On transport failure
    /// * `Err(SearchIndexError::QuerySyntax)` - If the engine rejected the translated query
    async fn search(&self, request: &SearchRequest) -> Result<ResultPage, SearchIndexError>;

    /// Fetch a document by id.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(ItemDocument))` - If the document exists
    /// * `Ok(None)` - If it does not
    async fn get_document(&self, id: u64) -> Result<Option<ItemDocument>, SearchIndexError>;

    /// Delete a document from the search index.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    async fn delete_document(&self, id: u64) -> Result<(), SearchIndexError>;
}
