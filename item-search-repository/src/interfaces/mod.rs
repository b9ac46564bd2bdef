//! Interface definitions for the search index provider.
//!
//! This module defines the abstract `SearchIndexProvider` trait that keeps the
//! repository facade independent of the concrete search backend.

mod search_index_provider;

pub use search_index_provider::SearchIndexProvider;
