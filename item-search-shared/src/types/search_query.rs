//! Search query types for the item search client.
//!
//! This module defines the transport-independent query descriptors: queries,
//! sorting, paging and aggregations. Validation happens when a descriptor is
//! built, so invalid requests never reach the search engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Page size used when a request does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Errors raised while building a query descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryBuildError {
    /// A query or sort was given an empty field name.
    #[error("Field name cannot be empty")]
    EmptyField,

    /// The lower bound of a range is greater than its upper bound.
    #[error("Invalid range: lower bound {low} is greater than upper bound {high}")]
    InvalidRange { low: f64, high: f64 },

    /// The page size is zero.
    #[error("Invalid page request: page {number} with size {size}, size must be greater than 0")]
    InvalidPage { number: usize, size: usize },

    /// An aggregation was given an empty name.
    #[error("Aggregation name cannot be empty")]
    EmptyAggregationName,

    /// A `search_after` cursor was set on a request without sort keys.
    #[error("search_after requires at least one sort key")]
    SearchAfterWithoutSort,
}

fn require_field(field: &str) -> Result<(), QueryBuildError> {
    if field.trim().is_empty() {
        return Err(QueryBuildError::EmptyField);
    }
    Ok(())
}

fn require_aggregation_name(name: &str) -> Result<(), QueryBuildError> {
    if name.trim().is_empty() {
        return Err(QueryBuildError::EmptyAggregationName);
    }
    Ok(())
}

/// A query against the item index.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    /// Match every document.
    #[default]
    MatchAll,

    /// Full-text match on an analyzed field.
    Match { field: String, text: String },

    /// Exact match on a keyword field.
    Term { field: String, value: String },

    /// Inclusive numeric range.
    Range { field: String, low: f64, high: f64 },
}

impl Query {
    /// The field this query targets, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            Query::MatchAll => None,
            Query::Match { field, .. } | Query::Term { field, .. } | Query::Range { field, .. } => {
                Some(field)
            }
        }
    }
}

/// Build a full-text match query.
///
/// # Example
///
/// ```
/// use item_search_shared::{match_query, Query};
///
/// let query = match_query("title", "xiaomi").unwrap();
/// assert_eq!(query.field(), Some("title"));
/// ```
pub fn match_query(
    field: impl Into<String>,
    text: impl Into<String>,
) -> Result<Query, QueryBuildError> {
    let field = field.into();
    require_field(&field)?;
    Ok(Query::Match {
        field,
        text: text.into(),
    })
}

/// Build an exact term query.
pub fn term_query(
    field: impl Into<String>,
    value: impl Into<String>,
) -> Result<Query, QueryBuildError> {
    let field = field.into();
    require_field(&field)?;
    Ok(Query::Term {
        field,
        value: value.into(),
    })
}

/// Build an inclusive range query.
///
/// # Returns
///
/// * `Ok(Query::Range)` - If `low <= high`
/// * `Err(QueryBuildError::InvalidRange)` - If `low > high` or either bound is NaN
/// * `Err(QueryBuildError::EmptyField)` - If the field name is empty
pub fn range_query(field: impl Into<String>, low: f64, high: f64) -> Result<Query, QueryBuildError> {
    let field = field.into();
    require_field(&field)?;
    // Written this way so NaN bounds are rejected as well.
    if !(low <= high) {
        return Err(QueryBuildError::InvalidRange { low, high });
    }
    Ok(Query::Range { field, low, high })
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A single sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

/// Zero-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub number: usize,
    pub size: usize,
}

impl PageRequest {
    /// Create a page request.
    ///
    /// # Returns
    ///
    /// * `Err(QueryBuildError::InvalidPage)` - If `size` is zero
    pub fn new(number: usize, size: usize) -> Result<Self, QueryBuildError> {
        if size == 0 {
            return Err(QueryBuildError::InvalidPage { number, size });
        }
        Ok(Self { number, size })
    }

    /// Offset of the first document of this page.
    pub fn offset(&self) -> usize {
        self.number.saturating_mul(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            number: 0,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Metric computed over a numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Avg,
    Sum,
    Min,
    Max,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Avg => "avg",
            MetricKind::Sum => "sum",
            MetricKind::Min => "min",
            MetricKind::Max => "max",
        }
    }
}

/// A named metric aggregation, used on its own or nested in a terms aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricAggregation {
    pub name: String,
    pub kind: MetricKind,
    pub field: String,
}

impl MetricAggregation {
    pub fn new(name: impl Into<String>, kind: MetricKind, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            field: field.into(),
        }
    }

    pub fn avg(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Avg, field)
    }

    pub fn sum(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Sum, field)
    }

    pub fn min(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Min, field)
    }

    pub fn max(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(name, MetricKind::Max, field)
    }

    fn validate(&self) -> Result<(), QueryBuildError> {
        require_aggregation_name(&self.name)?;
        require_field(&self.field)
    }
}

/// A named terms (bucket) aggregation with an optional nested metric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsAggregation {
    pub name: String,
    pub field: String,
    /// Maximum number of buckets; the engine default applies when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_aggregation: Option<MetricAggregation>,
}

impl TermsAggregation {
    /// Set the maximum number of buckets to return.
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Attach a metric evaluated within each bucket, replacing any previous one.
    pub fn with_sub_aggregation(mut self, metric: MetricAggregation) -> Self {
        self.sub_aggregation = Some(metric);
        self
    }

    fn validate(&self) -> Result<(), QueryBuildError> {
        require_aggregation_name(&self.name)?;
        require_field(&self.field)?;
        if let Some(sub) = &self.sub_aggregation {
            sub.validate()?;
        }
        Ok(())
    }
}

/// Build a terms aggregation named `name` over `field`.
///
/// Names and fields are checked by [`SearchRequest::validate`] before the
/// request is sent.
///
/// # Example
///
/// ```
/// use item_search_shared::{terms_aggregation, MetricAggregation};
///
/// let brands = terms_aggregation("brands", "brand")
///     .with_sub_aggregation(MetricAggregation::avg("priceAvg", "price"));
/// assert!(brands.sub_aggregation.is_some());
/// ```
pub fn terms_aggregation(name: impl Into<String>, field: impl Into<String>) -> TermsAggregation {
    TermsAggregation {
        name: name.into(),
        field: field.into(),
        size: None,
        sub_aggregation: None,
    }
}

/// Any top-level aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Aggregation {
    Terms(TermsAggregation),
    Metric(MetricAggregation),
}

impl Aggregation {
    pub fn name(&self) -> &str {
        match self {
            Aggregation::Terms(terms) => &terms.name,
            Aggregation::Metric(metric) => &metric.name,
        }
    }

    /// Check that every name and field of the aggregation is non-empty.
    pub fn validate(&self) -> Result<(), QueryBuildError> {
        match self {
            Aggregation::Terms(terms) => terms.validate(),
            Aggregation::Metric(metric) => metric.validate(),
        }
    }
}

impl From<TermsAggregation> for Aggregation {
    fn from(terms: TermsAggregation) -> Self {
        Aggregation::Terms(terms)
    }
}

impl From<MetricAggregation> for Aggregation {
    fn from(metric: MetricAggregation) -> Self {
        Aggregation::Metric(metric)
    }
}

/// A complete search request: query, sort keys, page and aggregations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: Query,
    #[serde(default)]
    pub sort: Vec<SortSpec>,
    #[serde(default)]
    pub page: PageRequest,
    #[serde(default)]
    pub aggregations: Vec<Aggregation>,
    /// When false, hits carry no `_source` and the page content is empty.
    #[serde(default = "default_fetch_source")]
    pub fetch_source: bool,
    /// Sort values of the last hit of the previous page. When set, results
    /// start after that hit and the page number is ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_after: Option<Vec<Value>>,
}

fn default_fetch_source() -> bool {
    true
}

impl SearchRequest {
    /// Create a request for the given query with the default page.
    pub fn new(query: Query) -> Self {
        Self {
            query,
            sort: Vec::new(),
            page: PageRequest::default(),
            aggregations: Vec::new(),
            fetch_source: true,
            search_after: None,
        }
    }

    /// Create a request matching every document.
    pub fn match_all() -> Self {
        Self::new(Query::MatchAll)
    }

    /// Append a sort key. Keys apply in the order they are added.
    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortSpec::new(field, direction));
        self
    }

    /// Set the zero-based page.
    ///
    /// # Returns
    ///
    /// * `Err(QueryBuildError::InvalidPage)` - If `size` is zero
    pub fn with_page(mut self, number: usize, size: usize) -> Result<Self, QueryBuildError> {
        self.page = PageRequest::new(number, size)?;
        Ok(self)
    }

    /// Add a top-level aggregation.
    pub fn with_aggregation(mut self, aggregation: impl Into<Aggregation>) -> Self {
        self.aggregations.push(aggregation.into());
        self
    }

    /// Do not fetch document sources, for aggregation-only requests.
    pub fn without_source(mut self) -> Self {
        self.fetch_source = false;
        self
    }

    /// Continue after the hit with the given sort values.
    pub fn with_search_after(mut self, sort_values: Vec<Value>) -> Self {
        self.search_after = Some(sort_values);
        self
    }

    /// Whether one of the sort keys targets `field`.
    pub fn is_sorted_by(&self, field: &str) -> bool {
        self.sort.iter().any(|s| s.field == field)
    }

    /// Check the descriptor before sending it.
    ///
    /// Builder functions already validate their own inputs; this catches
    /// descriptors assembled by hand or deserialized from elsewhere.
    pub fn validate(&self) -> Result<(), QueryBuildError> {
        match &self.query {
            Query::MatchAll => {}
            Query::Match { field, .. } | Query::Term { field, .. } => require_field(field)?,
            Query::Range { field, low, high } => {
                range_query(field.as_str(), *low, *high)?;
            }
        }
        for sort in &self.sort {
            require_field(&sort.field)?;
        }
        PageRequest::new(self.page.number, self.page.size)?;
        for aggregation in &self.aggregations {
            aggregation.validate()?;
        }
        if self.search_after.is_some() && self.sort.is_empty() {
            return Err(QueryBuildError::SearchAfterWithoutSort);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_query() {
        let query = match_query("title", "xiaomi").unwrap();
        assert_eq!(
            query,
            Query::Match {
                field: "title".to_string(),
                text: "xiaomi".to_string()
            }
        );
    }

    #[test]
    fn test_match_query_empty_field() {
        assert_eq!(match_query("", "xiaomi"), Err(QueryBuildError::EmptyField));
        assert_eq!(match_query("  ", "xiaomi"), Err(QueryBuildError::EmptyField));
    }

    #[test]
    fn test_term_query() {
        let query = term_query("brand", "Huawei").unwrap();
        assert_eq!(query.field(), Some("brand"));
        assert!(term_query("", "Huawei").is_err());
    }

    #[test]
    fn test_range_query_valid() {
        let query = range_query("price", 4000.0, 5000.0).unwrap();
        assert_eq!(
            query,
            Query::Range {
                field: "price".to_string(),
                low: 4000.0,
                high: 5000.0
            }
        );

        // Equal bounds are a single-point range.
        assert!(range_query("price", 100.0, 100.0).is_ok());
    }

    #[test]
    fn test_range_query_inverted() {
        let result = range_query("price", 5000.0, 4000.0);
        assert!(matches!(
            result,
            Err(QueryBuildError::InvalidRange { low, high }) if low == 5000.0 && high == 4000.0
        ));
    }

    #[test]
    fn test_range_query_nan() {
        assert!(range_query("price", f64::NAN, 10.0).is_err());
        assert!(range_query("price", 0.0, f64::NAN).is_err());
    }

    #[test]
    fn test_page_request() {
        let page = PageRequest::new(2, 3).unwrap();
        assert_eq!(page.offset(), 6);

        assert_eq!(
            PageRequest::new(1, 0),
            Err(QueryBuildError::InvalidPage { number: 1, size: 0 })
        );

        let default = PageRequest::default();
        assert_eq!(default.number, 0);
        assert_eq!(default.size, DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_search_request_builder() {
        let request = SearchRequest::new(match_query("category", "phone").unwrap())
            .with_sort("price", SortDirection::Desc)
            .with_page(0, 3)
            .unwrap();

        assert_eq!(request.sort, vec![SortSpec::desc("price")]);
        assert_eq!(request.page, PageRequest { number: 0, size: 3 });
        assert!(request.fetch_source);
        assert!(request.is_sorted_by("price"));
        assert!(!request.is_sorted_by("id"));
    }

    #[test]
    fn test_search_request_invalid_page() {
        let result = SearchRequest::match_all().with_page(0, 0);
        assert!(matches!(result, Err(QueryBuildError::InvalidPage { .. })));
    }

    #[test]
    fn test_terms_aggregation_sub_aggregation() {
        let agg = terms_aggregation("brands", "brand")
            .with_sub_aggregation(MetricAggregation::sum("priceSum", "price"))
            .with_sub_aggregation(MetricAggregation::avg("priceAvg", "price"));

        // Only the last nested metric is kept.
        assert_eq!(agg.sub_aggregation, Some(MetricAggregation::avg("priceAvg", "price")));

        let request = SearchRequest::match_all().with_aggregation(agg).without_source();
        assert_eq!(request.aggregations.len(), 1);
        assert_eq!(request.aggregations[0].name(), "brands");
        assert!(!request.fetch_source);
    }

    #[test]
    fn test_validate_hand_built_request() {
        let mut request = SearchRequest::match_all();
        assert!(request.validate().is_ok());

        request.query = Query::Range {
            field: "price".to_string(),
            low: 10.0,
            high: 1.0,
        };
        assert!(matches!(
            request.validate(),
            Err(QueryBuildError::InvalidRange { .. })
        ));

        let mut request = SearchRequest::match_all();
        request.page.size = 0;
        assert!(matches!(
            request.validate(),
            Err(QueryBuildError::InvalidPage { .. })
        ));

        let request = SearchRequest::match_all().with_sort("", SortDirection::Asc);
        assert_eq!(request.validate(), Err(QueryBuildError::EmptyField));
    }

    #[test]
    fn test_metric_kind_names() {
        assert_eq!(MetricKind::Avg.as_str(), "avg");
        assert_eq!(MetricKind::Sum.as_str(), "sum");
        assert_eq!(MetricKind::Min.as_str(), "min");
        assert_eq!(MetricKind::Max.as_str(), "max");
        assert_eq!(SortDirection::Desc.as_str(), "desc");
    }

    #[test]
    fn test_validate_aggregation_names_and_fields() {
        let request = SearchRequest::match_all().with_aggregation(terms_aggregation("", "brand"));
        assert_eq!(request.validate(), Err(QueryBuildError::EmptyAggregationName));

        let request = SearchRequest::match_all().with_aggregation(terms_aggregation("brands", " "));
        assert_eq!(request.validate(), Err(QueryBuildError::EmptyField));

        let request = SearchRequest::match_all().with_aggregation(
            terms_aggregation("brands", "brand")
                .with_sub_aggregation(MetricAggregation::avg("priceAvg", "")),
        );
        assert_eq!(request.validate(), Err(QueryBuildError::EmptyField));

        let request =
            SearchRequest::match_all().with_aggregation(MetricAggregation::max("", "price"));
        assert_eq!(request.validate(), Err(QueryBuildError::EmptyAggregationName));

        let request = SearchRequest::match_all().with_aggregation(
            terms_aggregation("brands", "brand")
                .with_sub_aggregation(MetricAggregation::avg("priceAvg", "price")),
        );
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_search_after_requires_sort() {
        let cursor = vec![serde_json::json!(4299.0), serde_json::json!(5)];

        let request = SearchRequest::match_all().with_search_after(cursor.clone());
        assert_eq!(request.validate(), Err(QueryBuildError::SearchAfterWithoutSort));

        let request = SearchRequest::match_all()
            .with_sort("price", SortDirection::Desc)
            .with_sort("id", SortDirection::Asc)
            .with_search_after(cursor.clone());
        assert!(request.validate().is_ok());
        assert_eq!(request.search_after, Some(cursor));
    }
}
