//! Request dispatch module
//!
//! Entry point for HTTP request processing: extracts the request context, loads
//! the cache snapshot once and writes the access log line.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{CONTENT_ENCODING, CONTENT_LENGTH, IF_NONE_MATCH, ACCEPT_ENCODING};
use hyper::{Method, Request, Response};

use crate::config::AppState;
use crate::handler::static_files;
use crate::logger::{self, AccessLogEntry};

/// Request context encapsulating information needed for request processing
pub struct RequestContext<'a> {
    /// Path and query as received
    pub target: &'a str,
    pub is_head: bool,
    pub if_none_match: Option<String>,
    pub accept_encoding: Option<String>,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let target = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.uri().path(), |pq| pq.as_str());
        Self {
            target,
            is_head: req.method() == Method::HEAD,
            if_none_match: header_string(req, &IF_NONE_MATCH),
            accept_encoding: header_string(req, &ACCEPT_ENCODING),
        }
    }
}

fn header_string<B>(req: &Request<B>, name: &hyper::header::HeaderName) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let access_log = state.config.logging.access_log;
    let mut entry =
        access_log.then(|| AccessLogEntry::from_request(remote_addr.ip().to_string(), &req));

    let ctx = RequestContext::from_request(&req);
    let cache = state.cache.snapshot();
    let response = static_files::serve(&ctx, &cache).await;

    if let Some(entry) = entry.as_mut() {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        entry.content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        entry.set_duration(started.elapsed());
        logger::log_request_complete(entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_from_request() {
        let req = Request::builder()
            .method(Method::HEAD)
            .uri("/app/settings?tab=2")
            .header(IF_NONE_MATCH, "\"1-2\"")
            .header(ACCEPT_ENCODING, "gzip")
            .body(())
            .unwrap();
        let ctx = RequestContext::from_request(&req);
        assert_eq!(ctx.target, "/app/settings?tab=2");
        assert!(ctx.is_head);
        assert_eq!(ctx.if_none_match.as_deref(), Some("\"1-2\""));
        assert_eq!(ctx.accept_encoding.as_deref(), Some("gzip"));
    }

    #[test]
    fn test_context_without_headers() {
        let req = Request::builder().uri("/styles.css").body(()).unwrap();
        let ctx = RequestContext::from_request(&req);
        assert_eq!(ctx.target, "/styles.css");
        assert!(!ctx.is_head);
        assert!(ctx.if_none_match.is_none());
        assert!(ctx.accept_encoding.is_none());
    }

    #[tokio::test]
    async fn test_handle_request_serves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();

        let mut config = crate::config::Config::defaults().unwrap();
        config.static_files.directory = dir.path().to_string_lossy().into_owned();
        let state = Arc::new(AppState::new(config));
        crate::static_cache::load(
            &state.cache,
            dir.path(),
            "/index.html",
            &std::collections::HashMap::new(),
        )
        .await;

        let req = Request::builder().uri("/deep/link").body(()).unwrap();
        let response = handle_request(req, state, "127.0.0.1:9000".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), hyper::StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_LENGTH], "11");
    }
}
