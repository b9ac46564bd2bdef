//! This module defines the core data structures and types used across the item search client.
//! It re-exports the item document, query descriptors and result pages.

pub mod item_document;
pub mod search_query;
pub mod search_result;

pub use item_document::ItemDocument;
pub use search_query::SearchRequest;
pub use search_result::ResultPage;
