//! Utility functions for the item search repository.

use serde_json::Value;

/// Extract a human-readable reason from an engine error object.
///
/// Accepts either a full error response body (`{"error": {...}, "status": 400}`)
/// or the bare error object found on bulk items. Prefers the first root cause,
/// since the top-level reason of search errors is often just "all shards failed".
///
/// # Example
///
/// ```
/// use item_search_repository::utils::error_reason;
/// use serde_json::json;
///
/// let body = json!({"error": {"type": "parsing_exception", "reason": "unknown query [mtch]"}});
/// assert_eq!(error_reason(&body), "parsing_exception: unknown query [mtch]");
/// ```
pub fn error_reason(body: &Value) -> String {
    let error = body.get("error").unwrap_or(body);

    if let Some(reason) = error.as_str() {
        return reason.to_string();
    }

    let cause = error
        .get("root_cause")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .unwrap_or(error);

    let reason = cause
        .get("reason")
        .or_else(|| error.get("reason"))
        .and_then(|r| r.as_str());
    let error_type = cause
        .get("type")
        .or_else(|| error.get("type"))
        .and_then(|t| t.as_str());

    match (error_type, reason) {
        (Some(t), Some(r)) => format!("{}: {}", t, r),
        (None, Some(r)) => r.to_string(),
        (Some(t), None) => t.to_string(),
        (None, None) => body.to_string(),
    }
}
