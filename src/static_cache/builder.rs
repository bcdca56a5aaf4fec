//! Cache builder
//!
//! Walks the static root once and indexes every file with a known content type.
//! Directories are listed concurrently on the runtime; a directory that cannot be
//! read is logged and skipped, the rest of the tree is still indexed. Only
//! metadata is touched here, file contents are read on first request.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use hyper::header::{HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH};
use tokio::task::JoinSet;

use super::{CacheEntry, CacheHandle, StaticCache};
use crate::error::Error;
use crate::http::mime;
use crate::logger;

/// Headers attached to the default document, overriding any `Cache-Control`
pub const DEFAULT_DOCUMENT_HEADERS: [(&str, &str); 11] = [
    ("cache-control", "no-cache"),
    (
        "strict-transport-security",
        "max-age=31536000 ; includeSubDomains",
    ),
    ("x-frame-options", "deny"),
    ("x-xss-protection", "1; mode=block"),
    ("x-content-type-options", "nosniff"),
    ("content-security-policy", "default-src 'self'"),
    ("x-permitted-cross-domain-policies", "none"),
    ("referrer-policy", "no-referrer"),
    ("feature-policy", "vibrate 'none'; geolocation 'none'"),
    ("x-dns-prefetch-control", "off"),
    ("expect-ct", "enforce, max-age=30"),
];

/// Files and subdirectories found in one directory
#[derive(Debug, Default)]
struct Listing {
    files: Vec<PathBuf>,
    subdirs: Vec<PathBuf>,
}

/// Index `root` and publish the result through `handle`
///
/// Returns the number of indexed files.
pub async fn load(
    handle: &CacheHandle,
    root: impl AsRef<Path>,
    default_document: &str,
    default_headers: &HashMap<String, String>,
) -> usize {
    let started = Instant::now();
    let root = root.as_ref();
    let cache = build(root, default_document, default_headers).await;
    let count = cache.len();

    if cache.get(default_document).is_none() {
        logger::log_default_document_missing(default_document, root);
    }

    handle.publish(cache);
    logger::log_cache_loaded(count, root, started.elapsed());
    count
}

/// Index `root` into a new snapshot without publishing it
pub async fn build(
    root: &Path,
    default_document: &str,
    default_headers: &HashMap<String, String>,
) -> StaticCache {
    let extra_headers = parse_headers(default_headers);
    let mut files = HashMap::new();

    let mut tasks = JoinSet::new();
    tasks.spawn(list_directory(root.to_path_buf()));

    while let Some(joined) = tasks.join_next().await {
        let listing = match joined {
            Ok(Ok(listing)) => listing,
            Ok(Err(e)) => {
                logger::log_load_error(&e);
                continue;
            }
            Err(e) => {
                logger::log_error(&format!("Directory scan task failed: {e}"));
                continue;
            }
        };

        for dir in listing.subdirs {
            tasks.spawn(list_directory(dir));
        }

        for path in listing.files {
            let Some(content_type) = mime::content_type_for_path(&path) else {
                continue;
            };
            let Some(url_key) = url_key(root, &path) else {
                logger::log_warning(&format!(
                    "Skipping file with non UTF-8 path: {}",
                    path.display()
                ));
                continue;
            };

            let mut entry = CacheEntry::new(url_key.clone(), path, content_type);
            for (name, value) in &extra_headers {
                entry.set_header(name.clone(), value.clone());
            }
            if url_key == default_document {
                for (name, value) in DEFAULT_DOCUMENT_HEADERS {
                    entry.set_header(
                        HeaderName::from_static(name),
                        HeaderValue::from_static(value),
                    );
                }
            }
            files.insert(url_key, entry);
        }
    }

    StaticCache::new(default_document.to_string(), files)
}

/// List one directory, classifying entries into files and subdirectories
///
/// Symlinks to files are followed; symlinked directories are skipped so a link
/// cycle cannot make the walk unbounded.
async fn list_directory(dir: PathBuf) -> Result<Listing, Error> {
    let mut entries = tokio::fs::read_dir(&dir).await.map_err(|source| Error::Load {
        path: dir.clone(),
        source,
    })?;

    let mut listing = Listing::default();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(source) => {
                // Keep what was listed so far
                logger::log_load_error(&Error::Load {
                    path: dir.clone(),
                    source,
                });
                break;
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(source) => {
                logger::log_load_error(&Error::Load { path, source });
                continue;
            }
        };

        if file_type.is_dir() {
            listing.subdirs.push(path);
        } else if file_type.is_file() {
            listing.files.push(path);
        } else if file_type.is_symlink() {
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => listing.files.push(path),
                Ok(_) => {}
                Err(source) => logger::log_load_error(&Error::Load { path, source }),
            }
        }
    }

    Ok(listing)
}

/// URL key of `path` below `root`: `/`-separated with a leading slash
fn url_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut key = String::new();
    for component in relative.components() {
        if let Component::Normal(name) = component {
            key.push('/');
            key.push_str(name.to_str()?);
        }
    }
    Some(key)
}

/// Convert configured extra headers, dropping invalid ones
///
/// `Content-Length` and `Content-Encoding` describe the body actually sent and
/// are never taken from configuration.
fn parse_headers(headers: &HashMap<String, String>) -> Vec<(HeaderName, HeaderValue)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), _) if name == CONTENT_LENGTH || name == CONTENT_ENCODING => {
                    logger::log_warning(&format!(
                        "Ignoring default header '{name}', it is set per response"
                    ));
                    None
                }
                (Ok(name), Ok(value)) => Some((name, value)),
                _ => {
                    logger::log_warning(&format!("Ignoring invalid default header '{name}'"));
                    None
                }
            }
        })
        .collect()
}
