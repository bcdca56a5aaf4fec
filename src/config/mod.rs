// Configuration module entry point
// Manages application configuration and runtime state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::Result;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, Environment, LogFormat, LoggingConfig, PerformanceConfig, ServerConfig,
    ShutdownConfig, StaticFilesConfig,
};

/// Default config file name (without extension)
pub const DEFAULT_CONFIG_PATH: &str = "config";

type Builder = config::ConfigBuilder<config::builder::DefaultState>;

impl Config {
    /// Load configuration from the path given as first CLI argument,
    /// falling back to "config" (any supported extension)
    pub fn load() -> Result<Self> {
        let path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from specified file path (without extension)
    pub fn load_from(config_path: &str) -> Result<Self> {
        let builder = with_defaults(config::Config::builder())?
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("STATIC_SERVE").separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Built-in defaults only, no file or environment sources
    pub fn defaults() -> Result<Self> {
        Ok(with_defaults(config::Config::builder())?
            .build()?
            .try_deserialize()?)
    }

    pub fn get_socket_addr(&self) -> std::result::Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

fn with_defaults(builder: Builder) -> std::result::Result<Builder, config::ConfigError> {
    builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080)?
        .set_default("server.http2", false)?
        .set_default("server.environment", "production")?
        .set_default("static_files.directory", "public")?
        .set_default("static_files.default_document", "/index.html")?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.access_log", true)?
        .set_default("performance.keep_alive", true)?
        .set_default("performance.header_read_timeout", 30)?
        .set_default("shutdown.timeout_secs", 5)
}
