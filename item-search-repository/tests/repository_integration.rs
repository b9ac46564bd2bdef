//! End-to-end tests of the repository facade against an in-memory provider.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::TryStreamExt;
use item_search_repository::{
    BatchOperationResult, BatchOperationSummary, ItemRepository, RepositoryConfig,
    SearchIndexError, SearchIndexProvider,
};
use item_search_shared::{
    fields, match_query, range_query, term_query, terms_aggregation, Aggregation,
    AggregationResult, ItemDocument, MetricAggregation, MetricAggregationResult, MetricKind, Query,
    QueryBuildError, ResultPage, SearchRequest, SortDirection, SortSpec, TermsAggregationResult,
    TermsBucket,
};
use serde_json::{json, Value};

/// Evaluates requests over documents held in memory, approximating the engine.
#[derive(Default)]
struct InMemoryProvider {
    documents: Mutex<BTreeMap<u64, ItemDocument>>,
    searches: Mutex<usize>,
    /// Largest `from + size` accepted, like the engine's `index.max_result_window`.
    max_result_window: Option<usize>,
}

impl InMemoryProvider {
    fn with_result_window(max_result_window: usize) -> Self {
        Self {
            max_result_window: Some(max_result_window),
            ..Self::default()
        }
    }

    fn search_count(&self) -> usize {
        *self.searches.lock().unwrap()
    }
}

enum FieldValue {
    Number(f64),
    Text(String),
}

fn field_value(doc: &ItemDocument, field: &str) -> Option<FieldValue> {
    match field {
        fields::ID => Some(FieldValue::Number(doc.id as f64)),
        fields::PRICE => Some(FieldValue::Number(doc.price)),
        fields::TITLE => Some(FieldValue::Text(doc.title.clone())),
        fields::CATEGORY => Some(FieldValue::Text(doc.category.clone())),
        fields::BRAND => Some(FieldValue::Text(doc.brand.clone())),
        _ => None,
    }
}

fn matches(query: &Query, doc: &ItemDocument) -> bool {
    match query {
        Query::MatchAll => true,
        Query::Match { field, text } => match field_value(doc, field) {
            Some(FieldValue::Text(value)) => value.to_lowercase().contains(&text.to_lowercase()),
            _ => false,
        },
        Query::Term { field, value } => {
            matches!(field_value(doc, field), Some(FieldValue::Text(v)) if &v == value)
        }
        Query::Range { field, low, high } => {
            matches!(field_value(doc, field), Some(FieldValue::Number(n)) if *low <= n && n <= *high)
        }
    }
}

fn compare(a: &ItemDocument, b: &ItemDocument, sort: &[SortSpec]) -> Ordering {
    for spec in sort {
        let ordering = match (field_value(a, &spec.field), field_value(b, &spec.field)) {
            (Some(FieldValue::Number(x)), Some(FieldValue::Number(y))) => {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Some(FieldValue::Text(x)), Some(FieldValue::Text(y))) => x.cmp(&y),
            _ => Ordering::Equal,
        };
        let ordering = match spec.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// Compare a document against the sort values of a `search_after` cursor.
fn compare_to_cursor(doc: &ItemDocument, sort: &[SortSpec], cursor: &[Value]) -> Ordering {
    for (spec, after) in sort.iter().zip(cursor) {
        let ordering = match field_value(doc, &spec.field) {
            Some(FieldValue::Number(n)) => after
                .as_f64()
                .and_then(|a| n.partial_cmp(&a))
                .unwrap_or(Ordering::Equal),
            Some(FieldValue::Text(t)) => after
                .as_str()
                .map(|a| t.as_str().cmp(a))
                .unwrap_or(Ordering::Equal),
            None => Ordering::Equal,
        };
        let ordering = match spec.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn sort_values(doc: &ItemDocument, sort: &[SortSpec]) -> Vec<Value> {
    sort.iter()
        .map(|spec| match field_value(doc, &spec.field) {
            Some(FieldValue::Number(n)) => json!(n),
            Some(FieldValue::Text(t)) => json!(t),
            None => Value::Null,
        })
        .collect()
}

fn metric(metric: &MetricAggregation, docs: &[&ItemDocument]) -> MetricAggregationResult {
    let values: Vec<f64> = docs
        .iter()
        .filter_map(|doc| match field_value(doc, &metric.field) {
            Some(FieldValue::Number(n)) => Some(n),
            _ => None,
        })
        .collect();
    if values.is_empty() {
        let value = (metric.kind == MetricKind::Sum).then_some(0.0);
        return MetricAggregationResult { value };
    }
    let value = match metric.kind {
        MetricKind::Avg => values.iter().sum::<f64>() / values.len() as f64,
        MetricKind::Sum => values.iter().sum(),
        MetricKind::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
        MetricKind::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
    };
    MetricAggregationResult { value: Some(value) }
}

fn aggregate(aggregation: &Aggregation, docs: &[&ItemDocument]) -> AggregationResult {
    match aggregation {
        Aggregation::Metric(m) => AggregationResult::Metric(metric(m, docs)),
        Aggregation::Terms(terms) => {
            let mut groups: BTreeMap<String, Vec<&ItemDocument>> = BTreeMap::new();
            for doc in docs {
                if let Some(FieldValue::Text(key)) = field_value(doc, &terms.field) {
                    groups.entry(key).or_default().push(*doc);
                }
            }

            let mut buckets: Vec<TermsBucket> = groups
                .into_iter()
                .map(|(key, members)| {
                    let mut sub_aggregations = HashMap::new();
                    if let Some(sub) = &terms.sub_aggregation {
                        sub_aggregations.insert(
                            sub.name.clone(),
                            AggregationResult::Metric(metric(sub, &members)),
                        );
                    }
                    TermsBucket {
                        key,
                        doc_count: members.len() as u64,
                        sub_aggregations,
                    }
                })
                .collect();
            // Engine default: by count descending, then key ascending.
            buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then(a.key.cmp(&b.key)));
            buckets.truncate(terms.size.unwrap_or(10));

            AggregationResult::Terms(TermsAggregationResult { buckets })
        }
    }
}

#[async_trait]
impl SearchIndexProvider for InMemoryProvider {
    async fn ensure_index_exists(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn index_document(&self, document: &ItemDocument) -> Result<(), SearchIndexError> {
        self.documents
            .lock()
            .unwrap()
            .insert(document.id, document.clone());
        Ok(())
    }

    async fn bulk_index_documents(
        &self,
        documents: &[ItemDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let mut stored = self.documents.lock().unwrap();
        let results = documents
            .iter()
            .map(|doc| {
                stored.insert(doc.id, doc.clone());
                BatchOperationResult {
                    id: doc.document_id(),
                    success: true,
                    error: None,
                }
            })
            .collect();
        Ok(BatchOperationSummary::from_results(results))
    }

    async fn search(&self, request: &SearchRequest) -> Result<ResultPage, SearchIndexError> {
        *self.searches.lock().unwrap() += 1;

        let stored = self.documents.lock().unwrap();
        let mut hits: Vec<&ItemDocument> = stored
            .values()
            .filter(|doc| matches(&request.query, doc))
            .collect();
        hits.sort_by(|a, b| compare(a, b, &request.sort));

        let from = match &request.search_after {
            Some(_) => 0,
            None => request.page.offset(),
        };
        if let Some(window) = self.max_result_window {
            if from + request.page.size > window {
                return Err(SearchIndexError::query_syntax(format!(
                    "status 400: illegal_argument_exception: Result window is too large, \
                     from + size must be less than or equal to: [{}] but was [{}]",
                    window,
                    from + request.page.size
                )));
            }
        }

        let aggregations = request
            .aggregations
            .iter()
            .map(|agg| (agg.name().to_string(), aggregate(agg, &hits)))
            .collect();

        let total = hits.len() as u64;
        if let Some(after) = &request.search_after {
            hits.retain(|doc| compare_to_cursor(doc, &request.sort, after) == Ordering::Greater);
        }
        let paged: Vec<&ItemDocument> =
            hits.into_iter().skip(from).take(request.page.size).collect();

        let content = if request.fetch_source {
            paged.iter().map(|doc| (*doc).clone()).collect()
        } else {
            Vec::new()
        };

        let mut page = ResultPage::new(content, total, request.page.number, request.page.size)
            .with_aggregations(aggregations);
        if let (Some(last), false) = (paged.last(), request.sort.is_empty()) {
            page = page.with_last_sort_values(sort_values(last, &request.sort));
        }
        Ok(page)
    }

    async fn get_document(&self, id: u64) -> Result<Option<ItemDocument>, SearchIndexError> {
        Ok(self.documents.lock().unwrap().get(&id).cloned())
    }

    async fn delete_document(&self, id: u64) -> Result<(), SearchIndexError> {
        self.documents.lock().unwrap().remove(&id);
        Ok(())
    }
}

fn phones() -> Vec<ItemDocument> {
    vec![
        ItemDocument::new(1, "小米8", "手机", "小米", 2299.0, "img13.360buyimg.com/12345.jpg"),
        ItemDocument::new(2, "荣耀V10", "手机", "华为", 2799.0, "img13.360buyimg.com/111.jpg"),
        ItemDocument::new(3, "坚果手机R1", "手机", "锤子", 3699.0, "img13.360buyimg.com/222.jpg"),
        ItemDocument::new(4, "华为meta10", "手机", "华为", 4499.0, "img13.360buyimg.com/333.jpg"),
        ItemDocument::new(5, "小米Mix2S", "手机", "小米", 4299.0, "img13.360buyimg.com/444.jpg"),
    ]
}

async fn seeded_repository() -> (ItemRepository, Arc<InMemoryProvider>) {
    let provider = Arc::new(InMemoryProvider::default());
    let repository = ItemRepository::new(provider.clone());

    let items = phones();
    repository.save(&items[0]).await.unwrap();
    repository.save_all(&items[1..]).await.unwrap();

    (repository, provider)
}

fn ids(items: &[ItemDocument]) -> Vec<u64> {
    items.iter().map(|i| i.id).collect()
}

#[tokio::test]
async fn test_saved_item_is_found_by_match() {
    let provider = Arc::new(InMemoryProvider::default());
    let repository = ItemRepository::new(provider);

    let item = ItemDocument::new(7, "Redmi Note", "phone", "Xiaomi", 1299.0, "");
    repository.save(&item).await.unwrap();

    let page = repository
        .search(&SearchRequest::new(match_query(fields::TITLE, "redmi").unwrap()))
        .await
        .unwrap();

    assert_eq!(page.total_elements, 1);
    assert_eq!(page.content, vec![item]);
}

#[tokio::test]
async fn test_resave_overwrites() {
    let (repository, _) = seeded_repository().await;

    let mut updated = phones()[0].clone();
    updated.price = 1999.0;
    repository.save(&updated).await.unwrap();

    let all: Vec<ItemDocument> = repository.find_all(vec![]).try_collect().await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(repository.find_by_id(1).await.unwrap().unwrap().price, 1999.0);
}

#[tokio::test]
async fn test_find_all_sorted_by_price_desc() {
    let (repository, _) = seeded_repository().await;

    let items: Vec<ItemDocument> = repository
        .find_all(vec![SortSpec::desc(fields::PRICE)])
        .try_collect()
        .await
        .unwrap();

    assert_eq!(ids(&items), vec![4, 5, 3, 2, 1]);
}

#[tokio::test]
async fn test_find_by_price_between() {
    let (repository, _) = seeded_repository().await;

    let items = repository.find_by_price_between(4000.0, 5000.0).await.unwrap();
    assert_eq!(ids(&items), vec![5, 4]);

    // Bounds are inclusive
    let items = repository.find_by_price_between(2299.0, 2799.0).await.unwrap();
    assert_eq!(ids(&items), vec![1, 2]);

    let items = repository.find_by_price_between(10.0, 20.0).await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_inverted_price_range_is_rejected_before_search() {
    let (repository, provider) = seeded_repository().await;

    let result = repository.find_by_price_between(5000.0, 4000.0).await;

    assert!(matches!(
        result,
        Err(SearchIndexError::InvalidQuery(QueryBuildError::InvalidRange { .. }))
    ));
    assert_eq!(provider.search_count(), 0);
}

#[tokio::test]
async fn test_match_title() {
    let (repository, _) = seeded_repository().await;

    let request = SearchRequest::new(match_query(fields::TITLE, "小米").unwrap())
        .with_sort(fields::ID, SortDirection::Asc);
    let page = repository.search(&request).await.unwrap();

    assert_eq!(page.total_elements, 2);
    assert_eq!(ids(&page.content), vec![1, 5]);
}

#[tokio::test]
async fn test_term_and_range_queries() {
    let (repository, _) = seeded_repository().await;

    let page = repository
        .search(
            &SearchRequest::new(term_query(fields::BRAND, "华为").unwrap())
                .with_sort(fields::PRICE, SortDirection::Asc),
        )
        .await
        .unwrap();
    assert_eq!(ids(&page.content), vec![2, 4]);

    let page = repository
        .search(&SearchRequest::new(range_query(fields::PRICE, 0.0, 3000.0).unwrap()))
        .await
        .unwrap();
    assert_eq!(page.total_elements, 2);
}

#[tokio::test]
async fn test_paged_category_query() {
    let (repository, _) = seeded_repository().await;

    let request = SearchRequest::new(term_query(fields::CATEGORY, "手机").unwrap())
        .with_sort(fields::ID, SortDirection::Asc);

    let first = repository
        .search(&request.clone().with_page(0, 3).unwrap())
        .await
        .unwrap();
    assert_eq!(first.total_elements, 5);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.number, 0);
    assert_eq!(first.size, 3);
    assert_eq!(ids(&first.content), vec![1, 2, 3]);
    assert!(first.has_next());

    let second = repository
        .search(&request.clone().with_page(1, 3).unwrap())
        .await
        .unwrap();
    assert_eq!(ids(&second.content), vec![4, 5]);
    assert!(!second.has_next());

    let beyond = repository
        .search(&request.with_page(5, 3).unwrap())
        .await
        .unwrap();
    assert!(beyond.is_empty());
    assert_eq!(beyond.total_elements, 5);
}

#[tokio::test]
async fn test_concatenated_pages_equal_sorted_sequence() {
    let (repository, _) = seeded_repository().await;

    let sorted: Vec<ItemDocument> = repository
        .find_all(vec![SortSpec::asc(fields::PRICE)])
        .try_collect()
        .await
        .unwrap();

    let mut concatenated = Vec::new();
    for size in [1, 2, 3, 4] {
        concatenated.clear();
        let mut number = 0;
        loop {
            let request = SearchRequest::match_all()
                .with_sort(fields::PRICE, SortDirection::Asc)
                .with_sort(fields::ID, SortDirection::Asc)
                .with_page(number, size)
                .unwrap();
            let page = repository.search(&request).await.unwrap();
            concatenated.extend(page.content.clone());
            if !page.has_next() {
                break;
            }
            number += 1;
        }
        assert_eq!(concatenated, sorted, "page size {}", size);
    }
}

#[tokio::test]
async fn test_scan_with_small_pages_matches_single_page() {
    let provider = Arc::new(InMemoryProvider::default());
    let small = ItemRepository::with_config(
        provider.clone(),
        RepositoryConfig::default().scan_page_size(2),
    );
    let large = ItemRepository::new(provider.clone());

    // Equal prices rely on the id tiebreaker for a stable order.
    let items: Vec<ItemDocument> = (1..=9)
        .map(|i| ItemDocument::new(i, format!("item {}", i), "c", "b", 100.0, ""))
        .collect();
    large.save_all(&items).await.unwrap();

    let sort = vec![SortSpec::desc(fields::PRICE)];
    let paged: Vec<ItemDocument> = small.find_all(sort.clone()).try_collect().await.unwrap();
    let whole: Vec<ItemDocument> = large.find_all(sort).try_collect().await.unwrap();

    assert_eq!(paged, whole);
    assert_eq!(ids(&paged), (1..=9).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_brand_terms_with_avg_price() {
    let (repository, _) = seeded_repository().await;

    let request = SearchRequest::match_all()
        .with_aggregation(
            terms_aggregation("brands", fields::BRAND)
                .with_sub_aggregation(MetricAggregation::avg("priceAvg", fields::PRICE)),
        )
        .without_source();
    let page = repository.search(&request).await.unwrap();

    assert!(page.content.is_empty());
    assert_eq!(page.total_elements, 5);

    let brands = page.terms("brands").unwrap();
    assert_eq!(brands.buckets.len(), 3);

    let huawei = brands.bucket("华为").unwrap();
    assert_eq!(huawei.doc_count, 2);
    assert_eq!(huawei.metric("priceAvg").unwrap().value, Some(3649.0));

    let xiaomi = brands.bucket("小米").unwrap();
    assert_eq!(xiaomi.doc_count, 2);
    assert_eq!(xiaomi.metric("priceAvg").unwrap().value, Some(3299.0));

    let smartisan = brands.bucket("锤子").unwrap();
    assert_eq!(smartisan.doc_count, 1);
    assert_eq!(smartisan.metric("priceAvg").unwrap().value, Some(3699.0));
}

#[tokio::test]
async fn test_bucket_counts_and_averages() {
    let provider = Arc::new(InMemoryProvider::default());
    let repository = ItemRepository::new(provider);

    repository
        .save_all(&[
            ItemDocument::new(1, "x", "c", "A", 100.0, ""),
            ItemDocument::new(2, "y", "c", "A", 300.0, ""),
            ItemDocument::new(3, "z", "c", "B", 200.0, ""),
        ])
        .await
        .unwrap();

    let request = SearchRequest::match_all()
        .with_aggregation(
            terms_aggregation("brands", fields::BRAND)
                .with_sub_aggregation(MetricAggregation::avg("priceAvg", fields::PRICE)),
        )
        .with_aggregation(MetricAggregation::max("maxPrice", fields::PRICE))
        .without_source();
    let page = repository.search(&request).await.unwrap();

    let buckets = &page.terms("brands").unwrap().buckets;
    assert_eq!(buckets[0].key, "A");
    assert_eq!(buckets[0].doc_count, 2);
    assert_eq!(buckets[0].metric("priceAvg").unwrap().value, Some(200.0));
    assert_eq!(buckets[1].key, "B");
    assert_eq!(buckets[1].doc_count, 1);
    assert_eq!(buckets[1].metric("priceAvg").unwrap().value, Some(200.0));

    assert_eq!(page.metric("maxPrice").unwrap().value, Some(300.0));
}

#[tokio::test]
async fn test_delete() {
    let (repository, _) = seeded_repository().await;

    repository.delete(3).await.unwrap();
    assert!(repository.find_by_id(3).await.unwrap().is_none());

    // Deleting again is not an error
    repository.delete(3).await.unwrap();

    let remaining: Vec<ItemDocument> = repository.find_all(vec![]).try_collect().await.unwrap();
    assert_eq!(ids(&remaining), vec![1, 2, 4, 5]);
}

#[tokio::test]
async fn test_scan_past_result_window() {
    let provider = Arc::new(InMemoryProvider::with_result_window(10_000));
    let repository = ItemRepository::with_config(provider.clone(), RepositoryConfig::unlimited());

    let items: Vec<ItemDocument> = (1..=10_001)
        .map(|i| ItemDocument::new(i, format!("item {}", i), "c", "b", (i % 100) as f64, ""))
        .collect();
    repository.save_all(&items).await.unwrap();

    // Offset paging cannot reach the last document
    let deep = SearchRequest::match_all()
        .with_sort(fields::ID, SortDirection::Asc)
        .with_page(20, 500)
        .unwrap();
    assert!(matches!(
        repository.search(&deep).await,
        Err(SearchIndexError::QuerySyntax(_))
    ));

    let all: Vec<ItemDocument> = repository.find_all(vec![]).try_collect().await.unwrap();
    assert_eq!(ids(&all), (1..=10_001).collect::<Vec<_>>());

    // Equal prices are ordered by the id tiebreaker
    let by_price: Vec<ItemDocument> = repository
        .find_all(vec![SortSpec::desc(fields::PRICE)])
        .try_collect()
        .await
        .unwrap();
    assert_eq!(by_price.len(), 10_001);
    assert_eq!(by_price[0].price, 99.0);
    assert_eq!(ids(&by_price[..3]), vec![99, 199, 299]);
    assert_eq!(by_price[10_000].price, 0.0);

    let cheap = repository.find_by_price_between(0.0, 49.0).await.unwrap();
    assert_eq!(cheap.len(), 5_001);
    assert!(cheap.iter().all(|i| i.price <= 49.0));
    assert!(cheap.windows(2).all(|w| w[0].price <= w[1].price));
}
