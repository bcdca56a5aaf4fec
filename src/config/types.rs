// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub shutdown: ShutdownConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    /// Accept HTTP/2 (prior knowledge) next to HTTP/1.1
    pub http2: bool,
    pub environment: Environment,
}

/// Deployment environment
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Development,
    Test,
}

impl Environment {
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Static file tree configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StaticFilesConfig {
    /// Root directory that is indexed at startup
    pub directory: String,
    /// URL key of the document served for extension-less misses
    pub default_document: String,
    /// Extra headers attached to every cached file
    #[serde(default)]
    pub default_headers: HashMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log file path (optional, stdout if not set)
    #[serde(default)]
    pub log_file: Option<String>,
}

/// Output encoding of the log sink
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds allowed for a client to send request headers (HTTP/1)
    pub header_read_timeout: u64,
}

/// Shutdown configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ShutdownConfig {
    /// Drain deadline enforced by the watchdog
    pub timeout_secs: u64,
    /// Force the watchdog on or off; unset means "everywhere but production"
    #[serde(default)]
    pub watchdog: Option<bool>,
}

impl ShutdownConfig {
    /// Watchdog deadline for the given environment, `None` when disarmed
    pub fn watchdog_timeout(&self, environment: Environment) -> Option<Duration> {
        let armed = self.watchdog.unwrap_or(!environment.is_production());
        armed.then(|| Duration::from_secs(self.timeout_secs))
    }
}
