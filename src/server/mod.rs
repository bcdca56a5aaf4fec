// Server module entry point
// Listener setup, accept loop, per-connection serving and graceful shutdown

pub mod connection;
pub mod lifecycle;
pub mod listener;
pub mod signal;

// `loop` is a keyword, so the module is exposed as `server_loop`
#[path = "loop.rs"]
pub mod server_loop;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::AppState;
use crate::error::{Error, Result};
use crate::logger;

pub use lifecycle::{ConnectionHandle, ConnectionTracker, RequestGuard};
pub use listener::create_reusable_listener;
pub use server_loop::start_server_loop;

/// Bind the configured address
pub fn bind(state: &AppState) -> Result<TcpListener> {
    let addr = state
        .config
        .get_socket_addr()
        .map_err(Error::InvalidAddress)?;
    create_reusable_listener(addr).map_err(|source| Error::Bind { addr, source })
}

/// Start accepting on `listener` in the background
///
/// The task ends once `state.connections.shutdown()` has been called.
pub fn spawn(listener: TcpListener, state: &Arc<AppState>) -> Result<(SocketAddr, JoinHandle<()>)> {
    let addr = listener.local_addr()?;
    let task = tokio::spawn(start_server_loop(listener, Arc::clone(state)));
    Ok((addr, task))
}

/// Serve until SIGTERM/SIGINT, then drain every connection
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = bind(&state)?;
    let (addr, accept_task) = spawn(listener, &state)?;
    logger::log_server_start(&addr, &state.config);

    let signal = signal::shutdown_signal().await?;
    logger::log_shutdown_signal(signal);

    state.connections.shutdown().await;
    if let Err(e) = accept_task.await {
        logger::log_error(&format!("Accept loop failed: {e}"));
    }
    Ok(())
}
