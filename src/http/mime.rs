//! MIME type registry
//!
//! Maps file extensions to the Content-Type header served for them. Lookups go
//! to the `mime_guess` database; the common text types are pinned here so they
//! carry an explicit UTF-8 charset. Extensions the database does not know
//! resolve to `None`, which keeps the file out of the static cache.

use std::path::Path;

/// Text types served with a charset, ahead of the database lookup
fn charset_override(ext: &str) -> Option<&'static str> {
    let content_type = match ext {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "txt" => "text/plain; charset=utf-8",
        "md" | "markdown" => "text/markdown; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "js" | "mjs" => "application/javascript; charset=utf-8",
        "json" | "map" => "application/json; charset=utf-8",
        "webmanifest" => "application/manifest+json; charset=utf-8",
        _ => return None,
    };
    Some(content_type)
}

/// Get MIME Content-Type based on file extension (case-insensitive)
///
/// # Examples
/// ```
/// use static_serve::http::mime::content_type;
/// assert_eq!(content_type("html"), Some("text/html; charset=utf-8"));
/// assert_eq!(content_type("MP4"), Some("video/mp4"));
/// assert_eq!(content_type("unknownext"), None);
/// ```
pub fn content_type(extension: &str) -> Option<&'static str> {
    let ext = extension.to_ascii_lowercase();
    if ext.is_empty() {
        return None;
    }
    charset_override(&ext).or_else(|| mime_guess::from_ext(&ext).first_raw())
}

/// Resolve the Content-Type for a file path from its extension
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(content_type)
}
