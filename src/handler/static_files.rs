//! Static file serving module
//!
//! Resolves a request against the cache snapshot, answers conditional requests
//! and picks the smallest representation the client accepts.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderValue, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, ETAG, VARY,
};
use hyper::{Response, StatusCode};

use crate::handler::router::RequestContext;
use crate::http::cache::{check_etag_match, default_cache_control};
use crate::http::{self, parse_accept_encoding, Encoding};
use crate::logger;
use crate::static_cache::{CacheEntry, StaticCache};

/// Serve `ctx.target` from `cache`
pub async fn serve(ctx: &RequestContext<'_>, cache: &StaticCache) -> Response<Full<Bytes>> {
    let Some(entry) = cache.resolve(ctx.target) else {
        return http::build_404_response();
    };

    // Validator already known: answer without touching the body
    if let Some(etag) = entry.etag() {
        if check_etag_match(ctx.if_none_match.as_deref(), etag) {
            return http::build_304_response(etag, entry.headers());
        }
    }

    let identity = match entry.identity().await {
        Ok(body) => body,
        Err(e) => {
            logger::log_read_failure(&e);
            return http::build_500_response();
        }
    };

    let Some(etag) = entry.etag() else {
        return http::build_500_response();
    };
    if check_etag_match(ctx.if_none_match.as_deref(), etag) {
        return http::build_304_response(etag, entry.headers());
    }

    let (encoding, body) = negotiate(entry, identity, ctx.accept_encoding.as_deref()).await;
    build_response(entry, etag, encoding, body, ctx.is_head)
}

/// Pick the strictly smallest acceptable representation
///
/// Candidates are tried in client preference order; a candidate only wins when
/// it is smaller than the current best, so ties keep the earlier one.
async fn negotiate<'e>(
    entry: &'e CacheEntry,
    identity: &'e Bytes,
    accept_encoding: Option<&str>,
) -> (Encoding, &'e Bytes) {
    let accept = parse_accept_encoding(accept_encoding);
    let mut best: Option<(Encoding, &Bytes)> = accept
        .identity_acceptable
        .then_some((Encoding::Identity, identity));

    for encoding in accept.preferred {
        let body = match entry.variant(encoding).await {
            Ok(body) => body,
            Err(e) => {
                logger::log_encode_failure(entry.url_key(), &e);
                continue;
            }
        };
        match best {
            Some((_, current)) if body.len() >= current.len() => {}
            _ => best = Some((encoding, body)),
        }
    }

    // Identity refused and nothing else usable: identity is still the only
    // representation we have
    best.unwrap_or((Encoding::Identity, identity))
}

fn build_response(
    entry: &CacheEntry,
    etag: &str,
    encoding: Encoding,
    body: &Bytes,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_LENGTH, body.len());

    if encoding != Encoding::Identity {
        builder = builder.header(CONTENT_ENCODING, encoding.as_str());
    }
    if !entry.headers().contains_key(CACHE_CONTROL) {
        builder = builder.header(CACHE_CONTROL, default_cache_control());
    }

    let Some(headers) = builder.headers_mut() else {
        return http::build_500_response();
    };
    for (name, value) in entry.headers() {
        headers.insert(name, value.clone());
    }
    match HeaderValue::from_str(etag) {
        Ok(value) => {
            headers.insert(ETAG, value);
        }
        Err(e) => logger::log_error(&format!("Invalid ETag '{etag}': {e}")),
    }
    headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));

    let body = if is_head { Bytes::new() } else { body.clone() };
    builder.body(Full::new(body)).unwrap_or_else(|e| {
        logger::log_error(&format!(
            "Failed to build response for {}: {e}",
            entry.url_key()
        ));
        http::build_500_response()
    })
}
