//! Cached file descriptor
//!
//! A `CacheEntry` is created with metadata only. The identity body, its `ETag`
//! and every compressed variant are filled in on first use through compute-once
//! cells and never change afterwards.

use std::path::{Path, PathBuf};

use hyper::body::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use tokio::sync::OnceCell;

use crate::error::{Error, Result};
use crate::http::cache::generate_etag;
use crate::http::compress;
use crate::http::encoding::Encoding;

/// Uncompressed body together with the validator derived from it
#[derive(Debug)]
struct Identity {
    body: Bytes,
    etag: String,
}

/// One file of the static tree
#[derive(Debug)]
pub struct CacheEntry {
    url_key: String,
    content_type: &'static str,
    path: PathBuf,
    headers: HeaderMap,
    identity: OnceCell<Identity>,
    /// Compressed bodies, indexed like `Encoding::COMPRESSED`
    variants: [OnceCell<Bytes>; 3],
}

impl CacheEntry {
    pub fn new(url_key: String, path: PathBuf, content_type: &'static str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Self {
            url_key,
            content_type,
            path,
            headers,
            identity: OnceCell::new(),
            variants: Default::default(),
        }
    }

    pub fn url_key(&self) -> &str {
        &self.url_key
    }

    pub const fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Headers sent with every 200 response for this entry
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Set a header; only used while the snapshot is still private to the builder
    pub(crate) fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// `ETag` of the identity body, once it has been read
    pub fn etag(&self) -> Option<&str> {
        self.identity.get().map(|identity| identity.etag.as_str())
    }

    /// Uncompressed body, read from disk on first access
    pub async fn identity(&self) -> Result<&Bytes> {
        let identity = self
            .identity
            .get_or_try_init(|| async {
                let body = tokio::fs::read(&self.path)
                    .await
                    .map_err(|source| Error::Read {
                        path: self.path.clone(),
                        source,
                    })?;
                let etag = generate_etag(&body);
                Ok::<_, Error>(Identity {
                    body: Bytes::from(body),
                    etag,
                })
            })
            .await?;
        Ok(&identity.body)
    }

    /// Body for `encoding`, compressing (off the async workers) on first access
    pub async fn variant(&self, encoding: Encoding) -> Result<&Bytes> {
        let Some(slot) = self.slot(encoding) else {
            return self.identity().await;
        };

        slot.get_or_try_init(|| async {
            let body = self.identity().await?.clone();
            let compressed = tokio::task::spawn_blocking(move || compress::compress(encoding, &body))
                .await
                .map_err(|e| Error::Encode {
                    encoding: encoding.as_str(),
                    reason: e.to_string(),
                })??;
            Ok::<_, Error>(Bytes::from(compressed))
        })
        .await
    }

    /// Already materialized body for `encoding`, if any
    pub fn cached_variant(&self, encoding: Encoding) -> Option<&Bytes> {
        match self.slot(encoding) {
            Some(slot) => slot.get(),
            None => self.identity.get().map(|identity| &identity.body),
        }
    }

    fn slot(&self, encoding: Encoding) -> Option<&OnceCell<Bytes>> {
        Encoding::COMPRESSED
            .iter()
            .position(|&e| e == encoding)
            .map(|index| &self.variants[index])
    }
}
