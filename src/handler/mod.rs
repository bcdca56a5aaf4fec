//! Request handler module
//!
//! Dispatches every request to the static file cache. Any method is served the
//! same way; `HEAD` gets the headers without the body.

pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
