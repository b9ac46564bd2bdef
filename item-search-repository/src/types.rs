//! Request and response types for search index operations.

use crate::errors::SearchIndexError;

/// Result of a batch operation for a single item.
///
/// This struct represents the outcome of a single operation within a batch (one
/// document of a bulk save). It indicates whether the operation succeeded and
/// includes error details if it failed.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The engine document id.
    pub id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// Providers never abort a bulk operation on the first failed item; every document
/// gets a result so callers can see exactly which ones need attention.
#[derive(Debug, Clone)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// An empty summary for an empty batch.
    pub fn empty() -> Self {
        Self {
            total: 0,
            succeeded: 0,
            failed: 0,
            results: vec![],
        }
    }

    /// Build a summary from individual results.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// The failed items with their reasons.
    pub fn failures(&self) -> Vec<BulkItemFailure> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| BulkItemFailure {
                id: r.id.clone(),
                reason: r
                    .error
                    .as_ref()
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "unknown reason".to_string()),
            })
            .collect()
    }
}

/// A document that could not be saved during a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// The engine document id.
    pub id: String,
    /// Reason reported by the engine.
    pub reason: String,
}
