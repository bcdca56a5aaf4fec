//! Shared fixtures for integration tests: a static tree on disk and an
//! in-process server bound to an ephemeral port.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::{HeaderMap, Request, StatusCode};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use static_serve::config::{AppState, Config};
use static_serve::{server, static_cache};

pub const INDEX_HTML: &str = "<!DOCTYPE html><html><head><title>App</title></head><body><div id=\"app\"></div></body></html>";

/// Size of `/big.js`, large enough to span many socket writes
pub const BIG_FILE_LEN: usize = 4 * 1024 * 1024;

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    pub accept_task: JoinHandle<()>,
    pub dir: tempfile::TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn read_fixture(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.dir.path().join(name)).unwrap()
    }
}

pub fn write_fixture_tree(root: &Path) {
    std::fs::write(root.join("index.html"), INDEX_HTML.repeat(20)).unwrap();
    std::fs::write(
        root.join("styles.css"),
        "body { font-family: sans-serif; margin: 0; padding: 0; }\n".repeat(300),
    )
    .unwrap();
    std::fs::write(root.join("robots.txt"), "User-agent: *").unwrap();
    std::fs::create_dir_all(root.join("assets/js")).unwrap();
    std::fs::write(
        root.join("assets/js/app.js"),
        "export function main() { console.log('ready'); }\n".repeat(500),
    )
    .unwrap();
    // Pseudo-random so it does not compress to nothing
    let big: Vec<u8> = (0..BIG_FILE_LEN)
        .map(|i| b"abcdefghijklmnopqrstuvwxyz0123456789"[(i * 7 + i / 13) % 36])
        .collect();
    std::fs::write(root.join("big.js"), big).unwrap();
}

pub fn test_config(root: &Path) -> Config {
    let mut config = Config::defaults().unwrap();
    config.server.port = 0;
    config.static_files.directory = root.to_string_lossy().into_owned();
    // Never let the drain watchdog exit the test process
    config.shutdown.watchdog = Some(false);
    config.logging.access_log = false;
    config
}

pub async fn start_server() -> TestServer {
    let dir = tempfile::tempdir().unwrap();
    write_fixture_tree(dir.path());
    start_server_with(dir, |_| {}).await
}

pub async fn start_server_with(
    dir: tempfile::TempDir,
    customize: impl FnOnce(&mut Config),
) -> TestServer {
    let mut config = test_config(dir.path());
    customize(&mut config);
    let state = Arc::new(AppState::new(config));

    static_cache::load(
        &state.cache,
        dir.path(),
        &state.config.static_files.default_document,
        &HashMap::new(),
    )
    .await;

    let listener = server::bind(&state).unwrap();
    let (addr, accept_task) = server::spawn(listener, &state).unwrap();
    TestServer {
        addr,
        state,
        accept_task,
        dir,
    }
}

pub fn client() -> Client<HttpConnector, Empty<Bytes>> {
    Client::builder(TokioExecutor::new()).build_http()
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

pub async fn get(server: &TestServer, path: &str, headers: &[(&str, &str)]) -> TestResponse {
    request(server, "GET", path, headers).await
}

pub async fn request(
    server: &TestServer,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(server.url(path));
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = client()
        .request(builder.body(Empty::new()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    TestResponse {
        status,
        headers,
        body,
    }
}

/// Send a raw HTTP/1.1 request on an open stream
pub async fn send_raw(stream: &mut TcpStream, path: &str) {
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
}

/// Read one response with a `Content-Length` body; returns (head, body)
pub async fn read_raw_response(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let (head, leftover) = read_raw_head(stream).await;
    let body = read_raw_body(stream, &head, leftover).await;
    (head, body)
}

/// Read up to the end of the response head; returns the head and any body
/// bytes already received
pub async fn read_raw_head(stream: &mut TcpStream) -> (String, Vec<u8>) {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 16 * 1024];
    let head_end = loop {
        if let Some(pos) = find_subslice(&buffer, b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed before response head");
        buffer.extend_from_slice(&chunk[..n]);
    };
    let head = String::from_utf8_lossy(&buffer[..head_end]).into_owned();
    (head, buffer[head_end..].to_vec())
}

/// Read the rest of a body announced by `Content-Length` in `head`
pub async fn read_raw_body(stream: &mut TcpStream, head: &str, mut body: Vec<u8>) -> Vec<u8> {
    let content_length: usize = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse().ok())
                .flatten()
        })
        .unwrap_or(0);

    let mut chunk = [0u8; 16 * 1024];
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed after {} body bytes", body.len());
        body.extend_from_slice(&chunk[..n]);
    }
    body
}

/// Whether the peer closed the stream (EOF or reset) within `wait`
pub async fn is_closed(stream: &mut TcpStream, wait: Duration) -> bool {
    let mut byte = [0u8; 1];
    match tokio::time::timeout(wait, stream.read(&mut byte)).await {
        Ok(Ok(0) | Err(_)) => true,
        Ok(Ok(_)) | Err(_) => false,
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
