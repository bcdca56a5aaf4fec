// Server loop module
// Accepts connections until the tracker asks the listener to stop

use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use crate::config;
use crate::logger;

/// Accept loop; returns (dropping the listener) once shutdown starts
pub async fn start_server_loop(listener: TcpListener, state: Arc<config::AppState>) {
    let stop = state.connections.accept_stopped();

    loop {
        tokio::select! {
            biased;

            () = stop.cancelled() => break,

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => accept_connection(stream, peer_addr, &state),
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }
        }
    }

    drop(listener);
}
