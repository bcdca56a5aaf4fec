//! Static file cache
//!
//! The whole file tree is indexed once into an immutable [`StaticCache`]
//! snapshot. Requests read the snapshot through a [`CacheHandle`]; a reload
//! builds a complete new snapshot and swaps it in with a single atomic store.

mod builder;
mod entry;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;

pub use builder::{build, load, DEFAULT_DOCUMENT_HEADERS};
pub use entry::CacheEntry;

/// Immutable index of URL key to cached file
#[derive(Debug, Default)]
pub struct StaticCache {
    default_document: String,
    files: HashMap<String, CacheEntry>,
}

impl StaticCache {
    pub fn new(default_document: String, files: HashMap<String, CacheEntry>) -> Self {
        Self {
            default_document,
            files,
        }
    }

    pub fn default_document(&self) -> &str {
        &self.default_document
    }

    /// Exact lookup by URL key
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.files.get(key)
    }

    /// Resolve a request target to an entry
    ///
    /// Query string and fragment are ignored. A miss on a path whose last
    /// segment has no extension falls back to the default document, so client
    /// side routes like `/settings/profile` are served the app shell.
    pub fn resolve(&self, target: &str) -> Option<&CacheEntry> {
        let path = strip_query(target);
        self.files.get(path).or_else(|| {
            if has_extension(path) {
                None
            } else {
                self.files.get(&self.default_document)
            }
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }
}

/// Path part of a request target
fn strip_query(target: &str) -> &str {
    target
        .find(['?', '#'])
        .map_or(target, |index| &target[..index])
}

/// Whether the last path segment carries a file extension
fn has_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or(path);
    Path::new(segment).extension().is_some()
}

/// Process-wide reference to the current snapshot
#[derive(Debug, Default)]
pub struct CacheHandle {
    current: ArcSwap<StaticCache>,
}

impl CacheHandle {
    /// Handle pointing at an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot; hold it for the whole request so a concurrent reload
    /// cannot mix entries from two snapshots
    pub fn snapshot(&self) -> Arc<StaticCache> {
        self.current.load_full()
    }

    /// Replace the current snapshot
    pub fn publish(&self, cache: StaticCache) {
        self.current.store(Arc::new(cache));
    }
}
