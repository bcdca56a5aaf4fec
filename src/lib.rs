//! Pre-indexed static file server
//!
//! The file tree is indexed once at startup into an immutable cache snapshot.
//! Bodies and compressed variants are produced on first request and kept for
//! the life of the process. Shutdown drains in-flight requests before closing
//! their connections.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
pub mod static_cache;

pub use error::{Error, Result};
