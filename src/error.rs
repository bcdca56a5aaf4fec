//! Error types for the static file server

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while indexing, serving or wiring the server
#[derive(Error, Debug)]
pub enum Error {
    /// A subtree could not be scanned while building the cache
    #[error("failed to index {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cached file could not be read from disk after the cache was built
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A compression backend failed
    #[error("{encoding} encoding failed: {reason}")]
    Encode {
        encoding: &'static str,
        reason: String,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configured host/port do not form a socket address
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    /// Listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
