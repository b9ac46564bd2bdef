//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate. The REST endpoints it uses are shared with
//! Elasticsearch 7+, so the same provider talks to either engine.

use async_trait::async_trait;
use item_search_shared::{ItemDocument, ResultPage, SearchRequest};
use opensearch::{
    http::{
        request::JsonBody,
        response::Response,
        transport::{SingleNodeConnectionPool, TransportBuilder},
    },
    indices::{IndicesCreateParts, IndicesExistsParts},
    params::Refresh,
    BulkParts, DeleteParts, GetParts, IndexParts, OpenSearch, SearchParts,
};
use serde_json::{json, Value};
use tracing::{debug, error, info};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use crate::opensearch::{query_dsl, response};
use crate::types::BatchOperationSummary;
use crate::utils;

/// OpenSearch provider implementation.
///
/// All document operations go through the index alias from `IndexConfig`.
///
/// # Example
///
/// ```ignore
/// use item_search_repository::opensearch::{IndexConfig, OpenSearchProvider};
/// use item_search_shared::ItemDocument;
///
/// let config = IndexConfig::new("item", 0);
/// let provider = OpenSearchProvider::new("http://localhost:9200", config).await?;
/// provider.ensure_index_exists().await?;
///
/// let item = ItemDocument::new(1, "Mi 8", "phone", "Xiaomi", 2299.0, "img/12345.jpg");
/// // Creates the document, or replaces it if id 1 already exists
/// provider.index_document(&item).await?;
/// ```
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new OpenSearch provider connected to the specified URL.
    ///
    /// No request is sent here; connectivity problems surface on the first call.
    ///
    /// # Arguments
    ///
    /// * `url` - The server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index configuration containing alias and version
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchProvider)` - A new provider instance
    /// * `Err(SearchIndexError)` - If the URL is invalid or transport setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            alias = %index_config.alias,
            version = index_config.version,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    fn refresh(&self) -> Refresh {
        if self.index_config.refresh {
            Refresh::WaitFor
        } else {
            Refresh::False
        }
    }

    /// Read the body of a failed response and log it.
    async fn failure_reason(response: Response, operation: &str) -> (u16, String) {
        let status = response.status_code().as_u16();
        let text = response.text().await.unwrap_or_default();
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        let reason = utils::error_reason(&body);
        error!(status = status, reason = %reason, operation = operation, "Request failed");
        (status, reason)
    }
}

/// Map a non-success status to an error. Server-side failures, timeouts (408)
/// and rejected executions (429) mean the engine is unavailable; anything else
/// is a rejection of this particular request.
fn status_error(
    status: u16,
    reason: String,
    rejected: impl FnOnce(String) -> SearchIndexError,
) -> SearchIndexError {
    let msg = format!("status {}: {}", status, reason);
    match status {
        408 | 429 | 500.. => SearchIndexError::unavailable(msg),
        _ => rejected(msg),
    }
}

/// Map a failed `_search` status. A 404 means the index or alias is missing,
/// which is not a problem with the query.
fn search_status_error(status: u16, reason: String) -> SearchIndexError {
    if status == 404 {
        return SearchIndexError::index(format!("status {}: {}", status, reason));
    }
    status_error(status, reason, SearchIndexError::query_syntax)
}

fn transport_error(e: opensearch::Error) -> SearchIndexError {
    SearchIndexError::unavailable(e.to_string())
}

/// Build the newline-delimited `_bulk` body: one action line and one source line per document.
fn bulk_body(documents: &[ItemDocument]) -> Result<Vec<JsonBody<Value>>, SearchIndexError> {
    let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
    for doc in documents {
        let source =
            serde_json::to_value(doc).map_err(|e| SearchIndexError::serialization(e.to_string()))?;
        body.push(json!({ "index": { "_id": doc.document_id() } }).into());
        body.push(source.into());
    }
    Ok(body)
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    /// Create the versioned index with the item mappings and alias if the alias does not resolve.
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        let alias = self.index_config.alias.as_str();

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[alias]))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status_code().as_u16() {
            200 => {
                debug!(alias = %alias, "Index already exists");
                return Ok(());
            }
            404 => {}
            status => {
                return Err(status_error(
                    status,
                    "unexpected response to index existence check".to_string(),
                    SearchIndexError::index_creation,
                ));
            }
        }

        let index_name = self.index_config.versioned_index_name();
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&index_name))
            .body(get_index_settings(&self.index_config))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status_code().is_success() {
            let (status, reason) = Self::failure_reason(response, "create_index").await;
            // Another process may have created it between the two calls.
            if reason.contains("resource_already_exists_exception") {
                return Ok(());
            }
            return Err(status_error(status, reason, SearchIndexError::index_creation));
        }

        info!(index = %index_name, alias = %alias, "Created search index");
        Ok(())
    }

    async fn index_document(&self, document: &ItemDocument) -> Result<(), SearchIndexError> {
        let doc_id = document.document_id();

        let response = self
            .client
            .index(IndexParts::IndexId(&self.index_config.alias, &doc_id))
            .refresh(self.refresh())
            .body(document)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status_code().is_success() {
            let (status, reason) = Self::failure_reason(response, "index").await;
            return Err(status_error(status, reason, SearchIndexError::index));
        }

        debug!(doc_id = %doc_id, "Document indexed");
        Ok(())
    }

    /// Index all documents with a single `_bulk` request.
    ///
    /// Per-document failures are collected into the summary; only a failure of the
    /// request itself is returned as an error.
    async fn bulk_index_documents(
        &self,
        documents: &[ItemDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BatchOperationSummary::empty());
        }

        let body = bulk_body(documents)?;

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_config.alias))
            .refresh(self.refresh())
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status_code().is_success() {
            let (status, reason) = Self::failure_reason(response, "bulk").await;
            return Err(status_error(status, reason, SearchIndexError::index));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        let summary = response::parse_bulk_response(&body, documents)?;

        debug!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk index completed"
        );
        Ok(summary)
    }

    async fn search(&self, request: &SearchRequest) -> Result<ResultPage, SearchIndexError> {
        request.validate()?;
        let body = query_dsl::build_search_body(request);

        debug!(alias = %self.index_config.alias, body = %body, "Executing search");

        let response = self
            .client
            .search(SearchParts::Index(&[self.index_config.alias.as_str()]))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status_code().is_success() {
            let (status, reason) = Self::failure_reason(response, "search").await;
            return Err(search_status_error(status, reason));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        let page = response::parse_search_response(&body, request)?;

        debug!(
            total = page.total_elements,
            returned = page.len(),
            page = page.number,
            took_ms = page.took_ms,
            "Search completed"
        );
        Ok(page)
    }

    async fn get_document(&self, id: u64) -> Result<Option<ItemDocument>, SearchIndexError> {
        let doc_id = id.to_string();

        let response = self
            .client
            .get(GetParts::IndexId(&self.index_config.alias, &doc_id))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let (status, reason) = Self::failure_reason(response, "get").await;
            return Err(status_error(status, reason, SearchIndexError::unknown));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        response::parse_source(&body)
    }

    /// Delete a document. A missing document counts as deleted.
    async fn delete_document(&self, id: u64) -> Result<(), SearchIndexError> {
        let doc_id = id.to_string();

        let response = self
            .client
            .delete(DeleteParts::IndexId(&self.index_config.alias, &doc_id))
            .refresh(self.refresh())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let (status, reason) = Self::failure_reason(response, "delete").await;
            return Err(status_error(status, reason, SearchIndexError::delete));
        }

        debug!(doc_id = %doc_id, "Document deleted");
        Ok(())
    }
}
