mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    is_closed, read_raw_body, read_raw_head, read_raw_response, send_raw, start_server,
    BIG_FILE_LEN,
};
use tokio::net::TcpStream;

const WAIT: Duration = Duration::from_secs(10);

#[tokio::test]
async fn test_idle_connection_closed_on_shutdown() {
    let server = start_server().await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    send_raw(&mut stream, "/robots.txt").await;
    let (head, body) = read_raw_response(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 200"));
    assert_eq!(body, b"User-agent: *");

    // Keep-alive connection is now idle
    assert_eq!(server.state.connections.connection_count(), 1);

    tokio::time::timeout(WAIT, server.state.connections.shutdown())
        .await
        .expect("drain finished");
    assert!(is_closed(&mut stream, WAIT).await);
    assert_eq!(server.state.connections.connection_count(), 0);
}

#[tokio::test]
async fn test_in_flight_response_not_truncated() {
    let server = start_server().await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    send_raw(&mut stream, "/big.js").await;

    // The response has started; most of the body is still to be written
    let (head, received) = read_raw_head(&mut stream).await;
    assert!(head.starts_with("HTTP/1.1 200"));

    let tracker = Arc::clone(&server.state.connections);
    let shutdown = tokio::spawn(async move { tracker.shutdown().await });

    let body = read_raw_body(&mut stream, &head, received).await;
    assert_eq!(body.len(), BIG_FILE_LEN);
    assert_eq!(body, server.read_fixture("big.js"));
    assert!(is_closed(&mut stream, WAIT).await);

    tokio::time::timeout(WAIT, shutdown).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_idle_connection_closed_while_other_still_streaming() {
    let server = start_server().await;

    let mut streaming = TcpStream::connect(server.addr).await.unwrap();
    send_raw(&mut streaming, "/big.js").await;
    let (head, received) = read_raw_head(&mut streaming).await;
    assert!(head.starts_with("HTTP/1.1 200"));

    let mut idle = TcpStream::connect(server.addr).await.unwrap();
    send_raw(&mut idle, "/robots.txt").await;
    let (idle_head, _) = read_raw_response(&mut idle).await;
    assert!(idle_head.starts_with("HTTP/1.1 200"));

    let tracker = Arc::clone(&server.state.connections);
    let shutdown = tokio::spawn(async move { tracker.shutdown().await });

    // Nothing more has been read from the streaming connection yet
    assert!(is_closed(&mut idle, WAIT).await);

    let body = read_raw_body(&mut streaming, &head, received).await;
    assert_eq!(body.len(), BIG_FILE_LEN);
    assert_eq!(body, server.read_fixture("big.js"));
    assert!(is_closed(&mut streaming, WAIT).await);

    tokio::time::timeout(WAIT, shutdown).await.unwrap().unwrap();
    assert_eq!(server.state.connections.connection_count(), 0);
}

#[tokio::test]
async fn test_listener_stops_accepting() {
    let server = start_server().await;
    let addr = server.addr;

    tokio::time::timeout(WAIT, server.state.connections.shutdown())
        .await
        .unwrap();
    tokio::time::timeout(WAIT, server.accept_task).await.unwrap().unwrap();

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_second_shutdown_is_noop() {
    let server = start_server().await;
    let tracker = &server.state.connections;

    tokio::time::timeout(WAIT, tracker.shutdown()).await.unwrap();
    assert!(tracker.is_shutting_down());
    tokio::time::timeout(Duration::from_millis(100), tracker.shutdown())
        .await
        .unwrap();
}
