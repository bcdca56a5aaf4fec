//! HTTP cache control module
//!
//! Provides `ETag` generation and conditional request handling.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// One year, the lifetime of fingerprinted static assets
pub const ONE_YEAR_SECS: u32 = 31_536_000;

/// Generate a strong `ETag` from the body length and a content hash
///
/// # Arguments
/// * `content` - File content
///
/// # Returns
/// Quoted `ETag` string, e.g., `"1a-abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    let v = hasher.finish();
    format!("\"{:x}-{v:x}\"", content.len())
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Weak validators: `W/"abc123"` (weak comparison)
/// - Wildcard: `*`
///
/// # Returns
/// Returns true if matched (should return 304), false otherwise
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| {
        client_etag.split(',').any(|e| {
            let e = e.trim();
            e == "*" || e.strip_prefix("W/").unwrap_or(e) == etag
        })
    })
}

/// `Cache-Control` for files that do not define their own
pub fn default_cache_control() -> String {
    format!("public, max-age={ONE_YEAR_SECS}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_carries_length_prefix() {
        let etag = generate_etag(b"hello world");
        assert!(etag.starts_with("\"b-"));
        assert!(etag.ends_with('"'));
        assert!(generate_etag(b"").starts_with("\"0-"));
    }

    #[test]
    fn test_etag_tracks_content() {
        assert_eq!(generate_etag(b"body { }"), generate_etag(b"body { }"));
        assert_ne!(generate_etag(b"body { }"), generate_etag(b"body {}"));
    }

    #[test]
    fn test_if_none_match_forms() {
        let etag = generate_etag(b"app.js");
        let weak = format!("W/{etag}");
        let listed = format!("\"stale\", {etag}");
        assert!(check_etag_match(Some(&etag), &etag));
        assert!(check_etag_match(Some(&weak), &etag));
        assert!(check_etag_match(Some(&listed), &etag));
        assert!(check_etag_match(Some(" * "), &etag));
        assert!(!check_etag_match(Some("\"stale\""), &etag));
        assert!(!check_etag_match(Some(""), &etag));
        assert!(!check_etag_match(None, &etag));
    }

    #[test]
    fn test_default_cache_control_is_one_year() {
        assert_eq!(default_cache_control(), "public, max-age=31536000");
    }
}
