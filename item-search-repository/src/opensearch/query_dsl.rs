//! Translation of search requests into the engine's Query DSL.
//!
//! The same body is accepted by OpenSearch and Elasticsearch 7+.

use item_search_shared::{Aggregation, MetricAggregation, Query, SearchRequest, SortSpec};
use serde_json::{json, Map, Value};

/// Build the `_search` request body for a search request.
///
/// Offset paging is expressed with `from`/`size`, so `from + size` is bounded by
/// the index's `max_result_window` (10000 by default). A request carrying a
/// `search_after` cursor always starts at `from: 0` and has no such bound.
pub fn build_search_body(request: &SearchRequest) -> Value {
    let mut body = Map::new();

    body.insert("query".to_string(), query_to_json(&request.query));
    match &request.search_after {
        Some(after) => {
            body.insert("from".to_string(), json!(0));
            body.insert("search_after".to_string(), Value::Array(after.clone()));
        }
        None => {
            body.insert("from".to_string(), json!(request.page.offset()));
        }
    }
    body.insert("size".to_string(), json!(request.page.size));
    body.insert("track_total_hits".to_string(), json!(true));

    if !request.sort.is_empty() {
        let sort: Vec<Value> = request.sort.iter().map(sort_to_json).collect();
        body.insert("sort".to_string(), Value::Array(sort));
    }

    if !request.fetch_source {
        body.insert("_source".to_string(), json!(false));
    }

    if !request.aggregations.is_empty() {
        let aggs: Map<String, Value> = request
            .aggregations
            .iter()
            .map(|agg| (agg.name().to_string(), aggregation_to_json(agg)))
            .collect();
        body.insert("aggs".to_string(), Value::Object(aggs));
    }

    Value::Object(body)
}

/// Convert a query descriptor to its DSL clause.
pub fn query_to_json(query: &Query) -> Value {
    match query {
        Query::MatchAll => json!({ "match_all": {} }),
        Query::Match { field, text } => json!({
            "match": { field.as_str(): { "query": text } }
        }),
        Query::Term { field, value } => json!({
            "term": { field.as_str(): { "value": value } }
        }),
        Query::Range { field, low, high } => json!({
            "range": { field.as_str(): { "gte": low, "lte": high } }
        }),
    }
}

fn sort_to_json(sort: &SortSpec) -> Value {
    json!({ sort.field.as_str(): { "order": sort.direction.as_str() } })
}

fn metric_to_json(metric: &MetricAggregation) -> Value {
    json!({ metric.kind.as_str(): { "field": metric.field } })
}

fn aggregation_to_json(aggregation: &Aggregation) -> Value {
    match aggregation {
        Aggregation::Metric(metric) => metric_to_json(metric),
        Aggregation::Terms(terms) => {
            let mut spec = json!({ "field": terms.field });
            if let Some(size) = terms.size {
                spec["size"] = json!(size);
            }

            let mut agg = json!({ "terms": spec });
            if let Some(sub) = &terms.sub_aggregation {
                agg["aggs"] = json!({ sub.name.as_str(): metric_to_json(sub) });
            }
            agg
        }
    }
}
