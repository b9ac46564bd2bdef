//! Item document types for the search index.
//!
//! This module defines the document structure that is indexed in the search engine.

use serde::{Deserialize, Serialize};

/// Field names of the item document as they appear in the index.
pub mod fields {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const CATEGORY: &str = "category";
    pub const BRAND: &str = "brand";
    pub const PRICE: &str = "price";
    pub const IMAGES: &str = "images";
}

/// Document representation for the search index.
///
/// This struct represents an item as it is stored in the search engine.
/// Saving a document whose `id` already exists replaces the stored version.
///
/// # Fields
///
/// - `id`: Unique identifier for the item, also used as the engine document id
/// - `title`: Analyzed text, the primary full-text search field
/// - `category`: Keyword field for exact matches
/// - `brand`: Keyword field for exact matches and bucketing
/// - `price`: Orderable and range-queryable price
/// - `images`: Image URL, stored but not indexed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemDocument {
    pub id: u64,
    pub title: String,
    pub category: String,
    pub brand: String,
    pub price: f64,
    #[serde(default)]
    pub images: String,
}

impl ItemDocument {
    /// Create a new item document.
    ///
    /// # Example
    ///
    /// ```
    /// use item_search_shared::ItemDocument;
    ///
    /// let doc = ItemDocument::new(1, "Mi 8", "phone", "Xiaomi", 2299.0, "img/1.jpg");
    /// assert_eq!(doc.document_id(), "1");
    /// ```
    pub fn new(
        id: u64,
        title: impl Into<String>,
        category: impl Into<String>,
        brand: impl Into<String>,
        price: f64,
        images: impl Into<String>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            category: category.into(),
            brand: brand.into(),
            price,
            images: images.into(),
        }
    }

    /// Generate the document ID used in the search index.
    pub fn document_id(&self) -> String {
        self.id.to_string()
    }
}
