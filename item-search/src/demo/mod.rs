//! Demonstration scenarios for the item repository.
//!
//! Each scenario is a small method on [`DemoRunner`] returning its result so it
//! can be checked in tests; [`DemoRunner::run`] executes them in order and logs
//! what they return.

use futures::TryStreamExt;
use item_search_repository::{ItemRepository, SearchIndexError};
use item_search_shared::{
    fields, match_query, terms_aggregation, ItemDocument, MetricAggregation, ResultPage,
    SearchRequest, SortDirection, SortSpec,
};
use tracing::{info, instrument};

use crate::DemoError;

/// Name of the brand terms aggregation.
pub const BRANDS_AGGREGATION: &str = "brands";

/// Name of the per-brand average price sub-aggregation.
pub const PRICE_AVG_AGGREGATION: &str = "priceAvg";

/// The sample catalogue saved by the demo.
pub fn sample_items() -> Vec<ItemDocument> {
    vec![
        ItemDocument::new(1, "小米8", "手机", "小米", 2299.0, "img13.360buyimg.com/12345.jpg"),
        ItemDocument::new(2, "荣耀V10", "手机", "华为", 2799.0, "img13.360buyimg.com/111.jpg"),
        ItemDocument::new(3, "坚果手机R1", "手机", "锤子", 3699.0, "img13.360buyimg.com/222.jpg"),
        ItemDocument::new(4, "华为meta10", "手机", "华为", 4499.0, "img13.360buyimg.com/333.jpg"),
        ItemDocument::new(5, "小米Mix2S", "手机", "小米", 4299.0, "img13.360buyimg.com/444.jpg"),
    ]
}

/// Document count and average price of one brand.
#[derive(Debug, Clone, PartialEq)]
pub struct BrandStats {
    pub brand: String,
    pub count: u64,
    pub avg_price: Option<f64>,
}

/// Runs the demonstration scenarios against a repository.
pub struct DemoRunner {
    repository: ItemRepository,
}

impl DemoRunner {
    pub fn new(repository: ItemRepository) -> Self {
        Self { repository }
    }

    /// Run every scenario in order.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), DemoError> {
        let saved = self.seed().await?;
        info!(saved, "Saved sample items");

        for item in self.list_by_price_desc().await? {
            info!(id = item.id, title = %item.title, price = item.price, "Item by price desc");
        }

        for item in self.price_between(4000.0, 5000.0).await? {
            info!(id = item.id, title = %item.title, price = item.price, "Item priced 4000-5000");
        }

        let page = self.match_title("小米").await?;
        info!(total = page.total_elements, "Title match");
        for item in &page.content {
            info!(id = item.id, title = %item.title, "Title match hit");
        }

        let page = self.page_by_category("手机", 0, 3).await?;
        info!(
            total = page.total_elements,
            total_pages = page.total_pages,
            number = page.number,
            size = page.size,
            "Category page"
        );
        for item in &page.content {
            info!(id = item.id, title = %item.title, "Category page hit");
        }

        let page = self.sorted_by_price("手机", SortDirection::Desc).await?;
        info!(total = page.total_elements, "Category sorted by price");
        for item in &page.content {
            info!(id = item.id, price = item.price, "Sorted search hit");
        }

        for stats in self.brand_price_averages().await? {
            info!(
                brand = %stats.brand,
                count = stats.count,
                avg_price = ?stats.avg_price,
                "Brand statistics"
            );
        }

        Ok(())
    }

    /// Save the first sample item on its own and the rest in one bulk request.
    ///
    /// Returns the number of saved items.
    pub async fn seed(&self) -> Result<usize, DemoError> {
        let items = sample_items();
        let Some((first, rest)) = items.split_first() else {
            return Ok(0);
        };

        self.repository.save(first).await?;
        let summary = self.repository.save_all(rest).await?;

        Ok(1 + summary.succeeded)
    }

    /// Every item, most expensive first.
    pub async fn list_by_price_desc(&self) -> Result<Vec<ItemDocument>, DemoError> {
        let items: Vec<ItemDocument> = self
            .repository
            .find_all(vec![SortSpec::desc(fields::PRICE)])
            .try_collect()
            .await?;
        Ok(items)
    }

    /// Items priced within `[low, high]`, cheapest first.
    pub async fn price_between(&self, low: f64, high: f64) -> Result<Vec<ItemDocument>, DemoError> {
        Ok(self.repository.find_by_price_between(low, high).await?)
    }

    /// First page of items whose title matches `text`.
    pub async fn match_title(&self, text: &str) -> Result<ResultPage, DemoError> {
        let request = SearchRequest::new(match_query(fields::TITLE, text)?);
        Ok(self.repository.search(&request).await?)
    }

    /// One page of a category, in id order.
    pub async fn page_by_category(
        &self,
        category: &str,
        number: usize,
        size: usize,
    ) -> Result<ResultPage, DemoError> {
        let request = SearchRequest::new(match_query(fields::CATEGORY, category)?)
            .with_sort(fields::ID, SortDirection::Asc)
            .with_page(number, size)?;
        Ok(self.repository.search(&request).await?)
    }

    /// First page of a category sorted by price.
    pub async fn sorted_by_price(
        &self,
        category: &str,
        direction: SortDirection,
    ) -> Result<ResultPage, DemoError> {
        let request = SearchRequest::new(match_query(fields::CATEGORY, category)?)
            .with_sort(fields::PRICE, direction);
        Ok(self.repository.search(&request).await?)
    }

    /// Item count and average price per brand, in bucket order.
    pub async fn brand_price_averages(&self) -> Result<Vec<BrandStats>, DemoError> {
        let request = SearchRequest::match_all()
            .with_aggregation(
                terms_aggregation(BRANDS_AGGREGATION, fields::BRAND).with_sub_aggregation(
                    MetricAggregation::avg(PRICE_AVG_AGGREGATION, fields::PRICE),
                ),
            )
            .without_source();
        let page = self.repository.search(&request).await?;

        let brands = page.terms(BRANDS_AGGREGATION).ok_or_else(|| {
            SearchIndexError::parse(format!("Missing aggregation '{}'", BRANDS_AGGREGATION))
        })?;

        Ok(brands
            .buckets
            .iter()
            .map(|bucket| BrandStats {
                brand: bucket.key.clone(),
                count: bucket.doc_count,
                avg_price: bucket.metric(PRICE_AVG_AGGREGATION).and_then(|m| m.value),
            })
            .collect())
    }
}
