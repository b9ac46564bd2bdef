//! Parsing of engine responses into typed results.
//!
//! Search responses are decoded with the originating request at hand, so each
//! aggregation result is read according to the kind that was requested instead
//! of being guessed from the response shape.

use std::collections::HashMap;

use item_search_shared::{
    Aggregation, AggregationResult, ItemDocument, MetricAggregationResult, ResultPage,
    SearchRequest, TermsAggregation, TermsAggregationResult, TermsBucket,
};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationResult, BatchOperationSummary};
use crate::utils;

/// Parse a `_search` response body into a result page.
pub fn parse_search_response(
    body: &Value,
    request: &SearchRequest,
) -> Result<ResultPage, SearchIndexError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| SearchIndexError::parse("Search response has no hits section"))?;

    let total = parse_total(&hits["total"])?;

    let content = if request.fetch_source {
        hits["hits"]
            .as_array()
            .map(|arr| arr.iter().map(parse_hit).collect::<Result<Vec<_>, _>>())
            .transpose()?
            .unwrap_or_default()
    } else {
        Vec::new()
    };

    let mut aggregations = HashMap::with_capacity(request.aggregations.len());
    for aggregation in &request.aggregations {
        let name = aggregation.name();
        let raw = body
            .get("aggregations")
            .and_then(|aggs| aggs.get(name))
            .ok_or_else(|| {
                SearchIndexError::parse(format!("Aggregation '{}' missing from response", name))
            })?;
        let result = match aggregation {
            Aggregation::Terms(terms) => AggregationResult::Terms(parse_terms(raw, terms)?),
            Aggregation::Metric(_) => AggregationResult::Metric(parse_metric(raw)),
        };
        aggregations.insert(name.to_string(), result);
    }

    let mut page = ResultPage::new(content, total, request.page.number, request.page.size)
        .with_aggregations(aggregations);
    page.took_ms = body["took"].as_u64().unwrap_or(0);

    // Sorted hits carry their sort values, with or without `_source`.
    let last_sort = hits["hits"]
        .as_array()
        .and_then(|arr| arr.last())
        .and_then(|hit| hit["sort"].as_array());
    if let Some(sort) = last_sort {
        page = page.with_last_sort_values(sort.clone());
    }
    Ok(page)
}

/// `hits.total` is an object (`{"value": n, "relation": "eq"}`) on Elasticsearch 7+
/// and OpenSearch, and a bare number on older engines.
fn parse_total(total: &Value) -> Result<u64, SearchIndexError> {
    total
        .as_u64()
        .or_else(|| total["value"].as_u64())
        .ok_or_else(|| SearchIndexError::parse(format!("Unexpected hits.total: {}", total)))
}

fn parse_hit(hit: &Value) -> Result<ItemDocument, SearchIndexError> {
    let source = hit.get("_source").ok_or_else(|| {
        SearchIndexError::parse(format!(
            "Hit {} has no _source",
            hit["_id"].as_str().unwrap_or("<unknown>")
        ))
    })?;
    serde_json::from_value(source.clone()).map_err(|e| SearchIndexError::parse(e.to_string()))
}

/// Parse a `get` response `_source` into a document.
pub fn parse_source(body: &Value) -> Result<Option<ItemDocument>, SearchIndexError> {
    if !body["found"].as_bool().unwrap_or(false) {
        return Ok(None);
    }
    parse_hit(body).map(Some)
}

fn parse_terms(
    raw: &Value,
    terms: &TermsAggregation,
) -> Result<TermsAggregationResult, SearchIndexError> {
    let buckets = raw["buckets"].as_array().ok_or_else(|| {
        SearchIndexError::parse(format!("Terms aggregation '{}' has no buckets", terms.name))
    })?;

    let buckets = buckets
        .iter()
        .map(|bucket| -> Result<TermsBucket, SearchIndexError> {
            let key = bucket_key(bucket);
            let mut sub_aggregations = HashMap::new();
            if let Some(sub) = &terms.sub_aggregation {
                let raw = bucket.get(sub.name.as_str()).ok_or_else(|| {
                    SearchIndexError::parse(format!(
                        "Aggregation '{}' missing from bucket '{}' of '{}'",
                        sub.name, key, terms.name
                    ))
                })?;
                sub_aggregations
                    .insert(sub.name.clone(), AggregationResult::Metric(parse_metric(raw)));
            }
            Ok(TermsBucket {
                key,
                doc_count: bucket["doc_count"].as_u64().unwrap_or(0),
                sub_aggregations,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TermsAggregationResult { buckets })
}

/// Keyword buckets carry a string key; numeric buckets carry a number plus an
/// optional `key_as_string`.
fn bucket_key(bucket: &Value) -> String {
    if let Some(key) = bucket["key_as_string"].as_str() {
        return key.to_string();
    }
    match &bucket["key"] {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_metric(raw: &Value) -> MetricAggregationResult {
    MetricAggregationResult {
        value: raw["value"].as_f64(),
    }
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<HashMap<String, BulkItemStatus>>,
}

#[derive(Debug, Deserialize)]
struct BulkItemStatus {
    #[serde(rename = "_id")]
    id: Option<String>,
    status: u16,
    error: Option<Value>,
}

/// Parse a `_bulk` response into a per-document summary.
///
/// Items are reported in request order. Documents with no matching item are
/// counted as failed.
pub fn parse_bulk_response(
    body: &Value,
    documents: &[ItemDocument],
) -> Result<BatchOperationSummary, SearchIndexError> {
    let response: BulkResponse = serde_json::from_value(body.clone())
        .map_err(|e| SearchIndexError::parse(format!("Invalid bulk response: {}", e)))?;

    let mut items = response.items.into_iter();
    let results = documents
        .iter()
        .map(|doc| {
            let expected_id = doc.document_id();
            let status = items.next().and_then(|item| item.into_values().next());
            match status {
                Some(status) if (200..300).contains(&status.status) && status.error.is_none() => {
                    BatchOperationResult {
                        id: status.id.unwrap_or(expected_id),
                        success: true,
                        error: None,
                    }
                }
                Some(status) => {
                    let reason = status
                        .error
                        .as_ref()
                        .map(utils::error_reason)
                        .unwrap_or_else(|| format!("status {}", status.status));
                    BatchOperationResult {
                        id: status.id.unwrap_or(expected_id),
                        success: false,
                        error: Some(SearchIndexError::index(reason)),
                    }
                }
                None => BatchOperationResult {
                    id: expected_id,
                    success: false,
                    error: Some(SearchIndexError::index("No result reported for document")),
                },
            }
        })
        .collect();

    Ok(BatchOperationSummary::from_results(results))
}
