//! Item repository implementation.
//!
//! This module provides the typed facade application code uses to save, find and
//! search items. It validates input, builds query descriptors and delegates to a
//! `SearchIndexProvider` for the actual backend calls.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use item_search_shared::{
    fields, range_query, ItemDocument, ResultPage, SearchRequest, SortDirection, SortSpec,
};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::RepositoryConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::BatchOperationSummary;

/// The main repository for item documents.
///
/// This is the high-level API that application code should use. The provider is
/// passed in explicitly; nothing is resolved from global state.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use item_search_repository::ItemRepository;
/// use item_search_repository::opensearch::{IndexConfig, OpenSearchProvider};
/// use item_search_shared::ItemDocument;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = IndexConfig::new("item", 0);
/// let provider = Arc::new(OpenSearchProvider::new("http://localhost:9200", config).await?);
/// let repository = ItemRepository::new(provider);
///
/// repository
///     .save(&ItemDocument::new(1, "Mi 8", "phone", "Xiaomi", 2299.0, "img/12345.jpg"))
///     .await?;
///
/// let items = repository.find_by_price_between(2000.0, 3000.0).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ItemRepository {
    provider: Arc<dyn SearchIndexProvider>,
    config: RepositoryConfig,
}

impl ItemRepository {
    /// Create a new ItemRepository with default configuration.
    ///
    /// The default configuration limits `save_all` to 1000 documents and scans
    /// with pages of 500.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self {
            provider,
            config: RepositoryConfig::default(),
        }
    }

    /// Create a new ItemRepository with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: RepositoryConfig) -> Self {
        Self { provider, config }
    }

    /// Check if batch size exceeds the configured limit.
    fn validate_batch_size(&self, size: usize) -> Result<(), SearchIndexError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchIndexError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    /// Save a document, replacing any stored document with the same id.
    pub async fn save(&self, item: &ItemDocument) -> Result<(), SearchIndexError> {
        self.provider.index_document(item).await
    }

    /// Save multiple documents in one bulk request.
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - If every document was saved
    /// * `Err(SearchIndexError::PartialBulkFailure)` - If some documents failed; the others
    ///   were still saved and the error lists the failed ids with their reasons
    /// * `Err(SearchIndexError::BatchSizeExceeded)` - If the batch exceeds the configured maximum
    /// * `Err(SearchIndexError)` - If the bulk request itself failed
    pub async fn save_all(
        &self,
        items: &[ItemDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if items.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        self.validate_batch_size(items.len())?;

        let summary = self.provider.bulk_index_documents(items).await?;
        if summary.failed > 0 {
            let failures = summary.failures();
            warn!(
                total = summary.total,
                failed = summary.failed,
                "Bulk save partially failed"
            );
            return Err(SearchIndexError::partial_bulk_failure(summary.total, failures));
        }

        Ok(summary)
    }

    /// Fetch a single document by id.
    pub async fn find_by_id(&self, id: u64) -> Result<Option<ItemDocument>, SearchIndexError> {
        self.provider.get_document(id).await
    }

    /// Delete a document by id. Deleting a missing document succeeds.
    pub async fn delete(&self, id: u64) -> Result<(), SearchIndexError> {
        self.provider.delete_document(id).await
    }

    /// Run a search request and return the requested page.
    pub async fn search(&self, request: &SearchRequest) -> Result<ResultPage, SearchIndexError> {
        request.validate()?;
        self.provider.search(request).await
    }

    /// Stream every document in the given order.
    ///
    /// The stream is lazy: pages are fetched as it is polled. Each call starts a fresh
    /// scan from the first page, reflecting the index as of each page request.
    pub fn find_all(
        &self,
        sort: Vec<SortSpec>,
    ) -> BoxStream<'_, Result<ItemDocument, SearchIndexError>> {
        let mut request = SearchRequest::match_all();
        request.sort = sort;
        self.scan(request)
    }

    /// Collect every document with `low <= price <= high`, ordered by ascending price.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<ItemDocument>)` - The matching documents, empty when none qualify
    /// * `Err(SearchIndexError::InvalidQuery)` - If `low > high`; nothing is sent
    pub async fn find_by_price_between(
        &self,
        low: f64,
        high: f64,
    ) -> Result<Vec<ItemDocument>, SearchIndexError> {
        let query = range_query(fields::PRICE, low, high)?;
        let request = SearchRequest::new(query).with_sort(fields::PRICE, SortDirection::Asc);
        self.scan(request).try_collect().await
    }

    /// Stream every result of `request` in its sort order.
    ///
    /// The request's own page is ignored. Pages of `scan_page_size` are fetched
    /// with a `search_after` cursor taken from the last hit of the previous page,
    /// so the scan is not bounded by the engine's result window. An ascending `id`
    /// sort key is appended as a tiebreaker so every cursor identifies exactly one
    /// document.
    pub fn scan(
        &self,
        mut request: SearchRequest,
    ) -> BoxStream<'_, Result<ItemDocument, SearchIndexError>> {
        if !request.is_sorted_by(fields::ID) {
            request.sort.push(SortSpec::asc(fields::ID));
        }
        let page_size = self.config.scan_page_size;

        let pages = stream::try_unfold(ScanCursor::Start, move |cursor| {
            let request = request.clone();
            async move {
                let search_after = match cursor {
                    ScanCursor::Start => None,
                    ScanCursor::After(sort_values) => Some(sort_values),
                    ScanCursor::Done => return Ok::<_, SearchIndexError>(None),
                };

                let mut paged = request.with_page(0, page_size)?;
                paged.search_after = search_after;
                let page = self.search(&paged).await?;
                debug!(
                    returned = page.len(),
                    total = page.total_elements,
                    "Scanned page"
                );

                // A short page is the last one.
                let next = if page.len() < page_size {
                    ScanCursor::Done
                } else {
                    let sort_values = page.last_sort_values.clone().ok_or_else(|| {
                        SearchIndexError::parse("Sorted page returned no sort values")
                    })?;
                    ScanCursor::After(sort_values)
                };
                Ok::<_, SearchIndexError>(Some((page.content, next)))
            }
        });

        pages
            .map_ok(|content| stream::iter(content.into_iter().map(Ok::<_, SearchIndexError>)))
            .try_flatten()
            .boxed()
    }
}

/// Position of a scan between pages.
enum ScanCursor {
    Start,
    After(Vec<Value>),
    Done,
}
