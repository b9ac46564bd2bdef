//! Search result types for the item search client.
//!
//! This module defines the response structures returned from search operations:
//! a page of documents plus any aggregation results, keyed by aggregation name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::item_document::ItemDocument;

/// Result of a metric aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregationResult {
    /// The computed value, `None` when no document contributed (e.g. avg of an empty bucket).
    pub value: Option<f64>,
}

/// A single bucket of a terms aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsBucket {
    /// The shared field value of the documents in this bucket.
    pub key: String,
    /// Number of documents in this bucket.
    pub doc_count: u64,
    /// Nested aggregation results evaluated within this bucket.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub sub_aggregations: HashMap<String, AggregationResult>,
}

impl TermsBucket {
    /// Look up a nested metric by name.
    pub fn metric(&self, name: &str) -> Option<&MetricAggregationResult> {
        self.sub_aggregations.get(name).and_then(AggregationResult::as_metric)
    }
}

/// Result of a terms aggregation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TermsAggregationResult {
    pub buckets: Vec<TermsBucket>,
}

impl TermsAggregationResult {
    /// Find the bucket with the given key.
    pub fn bucket(&self, key: &str) -> Option<&TermsBucket> {
        self.buckets.iter().find(|b| b.key == key)
    }
}

/// Aggregation result, tagged by aggregation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AggregationResult {
    Terms(TermsAggregationResult),
    Metric(MetricAggregationResult),
}

impl AggregationResult {
    pub fn as_terms(&self) -> Option<&TermsAggregationResult> {
        match self {
            AggregationResult::Terms(terms) => Some(terms),
            AggregationResult::Metric(_) => None,
        }
    }

    pub fn as_metric(&self) -> Option<&MetricAggregationResult> {
        match self {
            AggregationResult::Metric(metric) => Some(metric),
            AggregationResult::Terms(_) => None,
        }
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPage {
    /// The documents of this page, in result order.
    pub content: Vec<ItemDocument>,

    /// Total number of matching documents across all pages.
    pub total_elements: u64,

    /// Number of pages of `size` needed to hold `total_elements`.
    pub total_pages: u64,

    /// Zero-based number of this page.
    pub number: usize,

    /// Requested page size.
    pub size: usize,

    /// Time taken by the engine in milliseconds.
    #[serde(default)]
    pub took_ms: u64,

    /// Aggregation results keyed by aggregation name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub aggregations: HashMap<String, AggregationResult>,

    /// Sort values of the last hit, present when the request was sorted and
    /// the page is not empty. Passed back as `search_after` to fetch the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sort_values: Option<Vec<Value>>,
}

impl ResultPage {
    /// Create a page, deriving `total_pages` from `total_elements` and `size`.
    pub fn new(content: Vec<ItemDocument>, total_elements: u64, number: usize, size: usize) -> Self {
        Self {
            content,
            total_elements,
            total_pages: total_pages(total_elements, size),
            number,
            size,
            took_ms: 0,
            aggregations: HashMap::new(),
            last_sort_values: None,
        }
    }

    /// Create an empty page.
    pub fn empty(number: usize, size: usize) -> Self {
        Self::new(Vec::new(), 0, number, size)
    }

    /// Attach aggregation results.
    pub fn with_aggregations(mut self, aggregations: HashMap<String, AggregationResult>) -> Self {
        self.aggregations = aggregations;
        self
    }

    /// Attach the sort values of the last hit.
    pub fn with_last_sort_values(mut self, sort_values: Vec<Value>) -> Self {
        self.last_sort_values = Some(sort_values);
        self
    }

    /// Returns true if this page holds no documents.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns the number of documents in this page.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Whether a page after this one holds more documents.
    pub fn has_next(&self) -> bool {
        (self.number as u64).saturating_add(1) < self.total_pages
    }

    pub fn aggregation(&self, name: &str) -> Option<&AggregationResult> {
        self.aggregations.get(name)
    }

    /// Look up a terms aggregation by name; `None` if absent or of another kind.
    pub fn terms(&self, name: &str) -> Option<&TermsAggregationResult> {
        self.aggregation(name).and_then(AggregationResult::as_terms)
    }

    /// Look up a metric aggregation by name; `None` if absent or of another kind.
    pub fn metric(&self, name: &str) -> Option<&MetricAggregationResult> {
        self.aggregation(name).and_then(AggregationResult::as_metric)
    }
}

fn total_pages(total_elements: u64, size: usize) -> u64 {
    if size == 0 {
        return 0;
    }
    total_elements.div_ceil(size as u64)
}
