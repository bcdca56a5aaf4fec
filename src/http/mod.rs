//! HTTP protocol layer module
//!
//! Protocol helpers shared by the static file handler: MIME registry, validators,
//! content-coding negotiation, compression backends and fixed response builders.

pub mod cache;
pub mod compress;
pub mod encoding;
pub mod mime;
pub mod response;

// Re-export commonly used types
pub use encoding::{parse_accept_encoding, AcceptEncoding, Encoding};
pub use response::{build_304_response, build_404_response, build_500_response};
