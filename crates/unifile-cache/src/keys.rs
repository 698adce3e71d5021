//! Cache key builders for all Unifile cache entries.
//!
//! Centralising key construction prevents typos and makes it easy
//! to find every key the engine uses.

use unifile_core::types::FileId;

/// Prefix applied to all Unifile cache keys.
pub(crate) const PREFIX: &str = "unifile";

// ── File keys ──────────────────────────────────────────────

/// Cache key for file metadata by ID.
pub fn file_metadata(file_id: FileId) -> String {
    format!("{PREFIX}:meta:{file_id}")
}

/// Cache key for an issued access URL.
///
/// Anonymous callers share the `public` slot; `expires_in_seconds` is `0`
/// when the provider default applies.
pub fn file_url(file_id: FileId, user_id: Option<&str>, expires_in_seconds: u64) -> String {
    format!(
        "{PREFIX}:url:{file_id}:{}:{expires_in_seconds}",
        user_id.unwrap_or("public")
    )
}

/// Pattern matching every cached URL of a file.
pub fn file_url_pattern(file_id: FileId) -> String {
    format!("{PREFIX}:url:{file_id}:*")
}

// ── Listing keys ───────────────────────────────────────────

/// Cache key for a module listing as seen by one caller.
pub fn module_listing(module_id: &str, viewer: Option<&str>) -> String {
    format!(
        "{PREFIX}:list:module:{module_id}:{}",
        viewer.unwrap_or("public")
    )
}

/// Pattern matching every cached listing of a module.
pub fn module_listing_pattern(module_id: &str) -> String {
    format!("{PREFIX}:list:module:{module_id}:*")
}

/// Pattern matching every cached listing of a business entity (folder).
pub fn business_listing_pattern(business_id: &str) -> String {
    format!("{PREFIX}:list:business:{business_id}:*")
}
