// Connection handling module
// Serves a single TCP connection and keeps the tracker informed

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto;

use super::lifecycle::ConnectionHandle;
use crate::config::{self, AppState};
use crate::handler;
use crate::logger;

/// Register an accepted connection and serve it on its own task
pub fn accept_connection(stream: tokio::net::TcpStream, peer_addr: SocketAddr, state: &Arc<AppState>) {
    logger::log_connection_accepted(&peer_addr);
    if let Err(e) = stream.set_nodelay(true) {
        logger::log_connection_error(&e);
    }

    let connection = state.connections.register();
    tokio::spawn(handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        connection,
    ));
}

/// Protocol builder for the configured transport options
fn build_protocol(config: &config::Config) -> auto::Builder<TokioExecutor> {
    let mut builder = auto::Builder::new(TokioExecutor::new());
    builder
        .http1()
        .keep_alive(config.performance.keep_alive)
        .timer(TokioTimer::new())
        .header_read_timeout(Duration::from_secs(config.performance.header_read_timeout));

    if config.server.http2 {
        builder
    } else {
        builder.http1_only()
    }
}

/// Serve one connection until the peer leaves or the close signal fires.
///
/// This function:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Counts every request through a guard held by the service future
/// 3. On the close signal asks hyper to finish the current response and stop
/// 4. Deregisters the connection when the task ends (handle drop)
async fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    connection: ConnectionHandle,
) {
    let io = TokioIo::new(stream);
    let builder = build_protocol(&state.config);
    let close = connection.close_signal();

    let tracker = Arc::clone(connection.tracker());
    let id = connection.id();
    let service_state = Arc::clone(&state);
    let service = service_fn(move |req| {
        let state = Arc::clone(&service_state);
        let guard = tracker.request_started(id);
        async move {
            let response = handler::handle_request(req, state, peer_addr).await;
            drop(guard);
            response
        }
    });

    let conn = builder.serve_connection(io, service);
    tokio::pin!(conn);

    let mut closing = false;
    let result = loop {
        tokio::select! {
            res = conn.as_mut() => break res,
            () = close.cancelled(), if !closing => {
                closing = true;
                conn.as_mut().graceful_shutdown();
            }
        }
    };

    if let Err(err) = result {
        logger::log_connection_error(&err);
    }
    drop(connection);
}
