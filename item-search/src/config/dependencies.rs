//! Dependency initialization and wiring for the item search demo.

use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::DemoError;
use item_search_repository::opensearch::{IndexConfig, INDEX_NAME};
use item_search_repository::{
    ItemRepository, OpenSearchProvider, SearchIndexError, SearchIndexProvider,
};

/// Default search cluster URL.
const DEFAULT_SEARCH_URL: &str = "http://localhost:9200";

/// Default connection retry interval in seconds.
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;

/// Connection mode for the search cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if connection fails.
    FailFast,
    /// Retry connection at a fixed interval until successful.
    Retry,
}

impl ConnectionMode {
    /// Parse a connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive). Anything else
    /// falls back to fail-fast.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            other => {
                warn!(value = %other, "Invalid SEARCH_CONNECTION_MODE, defaulting to 'fail-fast'");
                Self::FailFast
            }
        }
    }

    /// Read the connection mode from `SEARCH_CONNECTION_MODE`.
    fn from_env() -> Self {
        env::var("SEARCH_CONNECTION_MODE")
            .map(|v| Self::parse(&v))
            .unwrap_or(Self::FailFast)
    }
}

/// Parse a boolean flag, accepting the usual spellings.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The repository, backed by the connected provider.
    pub repository: ItemRepository,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SEARCH_URL`: Search cluster URL (default: http://localhost:9200)
    /// - `INDEX_ALIAS`: Index alias name (default: "item")
    /// - `ITEM_INDEX_VERSION`: Index version number (default: 0)
    /// - `SEARCH_CONNECTION_MODE`: Connection mode - "fail-fast" or "retry" (default: fail-fast)
    /// - `SEARCH_RETRY_INTERVAL_SECS`: Retry interval in seconds (default: 15)
    /// - `SEARCH_REFRESH`: Wait for writes to become searchable (default: true)
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(DemoError)` - If initialization fails (only in fail-fast mode)
    pub async fn new() -> Result<Self, DemoError> {
        let search_url = env::var("SEARCH_URL").unwrap_or_else(|_| DEFAULT_SEARCH_URL.to_string());
        let connection_mode = ConnectionMode::from_env();
        let retry_interval = env::var("SEARCH_RETRY_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_INTERVAL_SECS);

        let index_alias = env::var("INDEX_ALIAS").unwrap_or_else(|_| INDEX_NAME.to_string());
        let index_version = env::var("ITEM_INDEX_VERSION")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);
        let refresh = env::var("SEARCH_REFRESH")
            .ok()
            .and_then(|v| parse_flag(&v))
            .unwrap_or(true);

        info!(
            search_url = %search_url,
            index_alias = %index_alias,
            index_version,
            refresh,
            connection_mode = ?connection_mode,
            retry_interval_secs = retry_interval,
            "Initializing dependencies"
        );

        let index_config = IndexConfig::new(index_alias, index_version).with_refresh(refresh);

        let provider = Self::connect(
            &search_url,
            index_config,
            connection_mode,
            Duration::from_secs(retry_interval),
        )
        .await?;

        info!("Search cluster connection established");

        let repository = ItemRepository::new(Arc::new(provider));

        Ok(Self { repository })
    }

    /// Connect to the search cluster with retry logic based on connection mode.
    ///
    /// The connection counts as established once the index and alias exist.
    async fn connect(
        url: &str,
        index_config: IndexConfig,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<OpenSearchProvider, DemoError> {
        loop {
            match Self::try_connect(url, index_config.clone()).await {
                Ok(provider) => return Ok(provider),
                Err(e) => match mode {
                    ConnectionMode::FailFast => {
                        return Err(DemoError::config(format!(
                            "Failed to connect to search cluster: {}",
                            e
                        )));
                    }
                    ConnectionMode::Retry => {
                        warn!(
                            search_url = %url,
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to search cluster, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }

    /// Create the provider and make sure the index and alias exist.
    async fn try_connect(
        url: &str,
        index_config: IndexConfig,
    ) -> Result<OpenSearchProvider, SearchIndexError> {
        let provider = OpenSearchProvider::new(url, index_config).await?;
        provider.ensure_index_exists().await?;
        Ok(provider)
    }
}
