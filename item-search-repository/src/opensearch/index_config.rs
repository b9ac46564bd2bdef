//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the item search index.

use item_search_shared::fields;
use serde_json::{json, Value};

/// The base name of the search index (without version).
pub const INDEX_NAME: &str = "item";

/// Configuration for the search index.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// The alias name for the search index (used for all operations).
    pub alias: String,
    /// The version number for the index (e.g., 0 for "item_v0").
    pub version: u32,
    /// Number of primary shards used when the index is created.
    pub shards: u32,
    /// Number of replicas used when the index is created.
    pub replicas: u32,
    /// Wait for writes to become visible to search before returning.
    pub refresh: bool,
}

impl IndexConfig {
    /// Create a new index configuration with 1 shard, 1 replica and refresh-on-write enabled.
    ///
    /// # Arguments
    ///
    /// * `alias` - The index alias name
    /// * `version` - The version number
    pub fn new(alias: impl Into<String>, version: u32) -> Self {
        Self {
            alias: alias.into(),
            version,
            shards: 1,
            replicas: 1,
            refresh: true,
        }
    }

    /// Set the shard and replica counts.
    pub fn with_shards(mut self, shards: u32, replicas: u32) -> Self {
        self.shards = shards;
        self.replicas = replicas;
        self
    }

    /// Enable or disable waiting for refresh on writes.
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// The physical index name behind the alias, e.g. "item_v0".
    pub fn versioned_index_name(&self) -> String {
        format!("{}_v{}", self.alias, self.version)
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(INDEX_NAME, 0)
    }
}

/// Get the index settings, mappings and alias for the item search index.
///
/// The configuration includes:
/// - **text**: `title`, analyzed for full-text match
/// - **keyword**: `category` and `brand` for exact matches and terms aggregations
/// - **double**: `price` for sorting, ranges and metrics
/// - **long**: `id` for sorting and as a paging tiebreaker
/// - `images` is stored in `_source` but not indexed
pub fn get_index_settings(config: &IndexConfig) -> Value {
    json!({
        "settings": {
            "number_of_shards": config.shards,
            "number_of_replicas": config.replicas
        },
        "mappings": {
            "properties": {
                (fields::ID): {
                    "type": "long"
                },
                (fields::TITLE): {
                    "type": "text"
                },
                (fields::CATEGORY): {
                    "type": "keyword"
                },
                (fields::BRAND): {
                    "type": "keyword"
                },
                (fields::PRICE): {
                    "type": "double"
                },
                (fields::IMAGES): {
                    "type": "keyword",
                    "index": false
                }
            }
        },
        "aliases": {
            config.alias.as_str(): {}
        }
    })
}
