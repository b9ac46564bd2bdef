//! # Item Search Shared
//!
//! This crate defines the data structures shared across the item search client.
//! It includes the indexed item document, the query builder used to describe
//! searches independently of the transport, and the result page returned from them.

pub mod types;

pub use types::item_document::{fields, ItemDocument};
pub use types::search_query::{
    match_query, range_query, term_query, terms_aggregation, Aggregation, MetricAggregation,
    MetricKind, PageRequest, Query, QueryBuildError, SearchRequest, SortDirection, SortSpec,
    TermsAggregation,
};
pub use types::search_result::{
    AggregationResult, MetricAggregationResult, ResultPage, TermsAggregationResult, TermsBucket,
};
