//! Configuration types for the ItemRepository.

/// Default page size used when scanning every matching document.
pub const DEFAULT_SCAN_PAGE_SIZE: usize = 500;

/// Configuration for the ItemRepository.
///
/// This struct allows customization of repository behavior around batch
/// operation limits and the page size used by full scans (`find_all`,
/// `find_by_price_between`).
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    /// Maximum number of documents allowed in a single `save_all` call.
    ///
    /// Set to `None` to disable the limit (not recommended for production).
    /// Defaults to 1000 if not specified.
    pub max_batch_size: Option<usize>,

    /// Page size used when streaming through all matching documents.
    ///
    /// Must be greater than 0. Defaults to 500.
    pub scan_page_size: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
            scan_page_size: DEFAULT_SCAN_PAGE_SIZE,
        }
    }
}

impl RepositoryConfig {
    /// Create a config with no batch size limit.
    ///
    /// # Warning
    ///
    /// Removing batch size limits can lead to memory issues and timeouts when
    /// saving very large batches.
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
            ..Self::default()
        }
    }

    /// Create a config with a custom batch size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
            ..Self::default()
        }
    }

    /// Set the page size used by full scans.
    pub fn scan_page_size(mut self, scan_page_size: usize) -> Self {
        self.scan_page_size = scan_page_size;
        self
    }
}
