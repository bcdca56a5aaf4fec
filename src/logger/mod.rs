//! Logger module
//!
//! Provides logging utilities for the static file server including:
//! - Server lifecycle logging
//! - Access logging with multiple formats
//! - Error and warning logging
//! - File-based logging support
//!
//! Events go through `tracing`; [`init`] installs the subscriber once at startup.
//! Before that (and in unit tests) the helpers are silent.

mod format;
pub mod writer;

pub use format::AccessLogEntry;

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Config, LogFormat, LoggingConfig};
use crate::error::Error;

/// Target used for access log events so they can be filtered separately
pub const ACCESS_TARGET: &str = "access";

/// Initialize the global subscriber from configuration
///
/// A valid `RUST_LOG` replaces `logging.level` entirely.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    let (level, recognized) = parse_level(&config.level);
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, rust_log.as_deref())?;

    let writer = writer::make_writer(config.log_file.as_deref())?;
    let ansi = config.log_file.is_none();

    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(writer))
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_ansi(ansi).with_writer(writer))
            .try_init(),
    };
    installed.map_err(std::io::Error::other)?;

    if !recognized {
        tracing::debug!(level = %config.level, "Unknown log level, using info");
    }
    Ok(())
}

/// Filter from `RUST_LOG` when it parses, otherwise from the configured level
/// with hyper's own chatter held at warn
fn build_filter(level: Level, rust_log: Option<&str>) -> std::io::Result<EnvFilter> {
    if let Some(filter) = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
    {
        return Ok(filter);
    }
    let hyper = "hyper=warn".parse().map_err(std::io::Error::other)?;
    Ok(EnvFilter::default()
        .add_directive(level.into())
        .add_directive(hyper))
}

/// Map a configured level name, falling back to info
fn parse_level(name: &str) -> (Level, bool) {
    match name.to_lowercase().as_str() {
        "trace" => (Level::TRACE, true),
        "debug" => (Level::DEBUG, true),
        "info" => (Level::INFO, true),
        "warn" | "warning" => (Level::WARN, true),
        "error" => (Level::ERROR, true),
        _ => (Level::INFO, false),
    }
}

pub fn log_server_start(addr: &SocketAddr, config: &Config) {
    tracing::info!(
        address = %addr,
        environment = %config.server.environment,
        directory = %config.static_files.directory,
        http2 = config.server.http2,
        workers = ?config.server.workers,
        "Static server listening on http://{addr}"
    );
}

pub fn log_cache_loaded(count: usize, root: &Path, elapsed: Duration) {
    tracing::info!(
        files = count,
        root = %root.display(),
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "Static cache loaded"
    );
}

pub fn log_load_error(err: &Error) {
    tracing::error!(error = %err, "Skipping unreadable part of the static tree");
}

pub fn log_default_document_missing(default_document: &str, root: &Path) {
    tracing::warn!(
        default_document,
        root = %root.display(),
        "Default document not found; extension-less misses will return 404"
    );
}

pub fn log_read_failure(err: &Error) {
    tracing::error!(error = %err, "Failed to read cached file");
}

pub fn log_encode_failure(url_key: &str, err: &Error) {
    tracing::error!(path = url_key, error = %err, "Compression failed, variant skipped");
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!(peer = %peer_addr, "Connection accepted");
}

pub fn log_connection_error(err: &impl std::fmt::Display) {
    tracing::debug!(error = %err, "Connection ended with error");
}

pub fn log_error(message: &str) {
    tracing::error!("{message}");
}

pub fn log_warning(message: &str) {
    tracing::warn!("{message}");
}

/// Emit the access log line for a completed request
///
/// Level follows the status: info below 400, warn for 4xx, error for 5xx.
pub fn log_request_complete(entry: &AccessLogEntry, format: &str) {
    let line = entry.format(format);
    match entry.status {
        500.. => tracing::error!(target: ACCESS_TARGET, status = entry.status, "{line}"),
        400..=499 => tracing::warn!(target: ACCESS_TARGET, status = entry.status, "{line}"),
        _ => tracing::info!(target: ACCESS_TARGET, status = entry.status, "{line}"),
    }
}

pub fn log_shutdown_signal(signal: &str) {
    tracing::info!(signal, "Shutdown signal received");
}

pub fn log_shutdown_started(connections: usize) {
    tracing::info!(connections, "Shutting down, draining connections");
}

pub fn log_idle_connections_closed(count: usize) {
    tracing::debug!(count, "Idle connections closed");
}

pub fn log_listener_closed() {
    tracing::info!("Listener closed, no longer accepting connections");
}

pub fn log_shutdown_complete() {
    tracing::info!("All connections drained, shutdown complete");
}

pub fn log_shutdown_timeout(timeout: Duration, remaining: usize) {
    tracing::error!(
        timeout_secs = timeout.as_secs(),
        remaining,
        "Connections did not drain in time, forcing exit"
    );
}
