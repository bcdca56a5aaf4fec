// Application state module
// Shared state handed to every connection task

use std::sync::Arc;

use super::types::Config;
use crate::server::lifecycle::ConnectionTracker;
use crate::static_cache::CacheHandle;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Current static cache snapshot
    pub cache: CacheHandle,
    /// Per-connection request accounting and shutdown drain
    pub connections: Arc<ConnectionTracker>,
}

impl AppState {
    /// Create `AppState` with an empty cache; call `static_cache::load` to fill it
    pub fn new(config: Config) -> Self {
        let watchdog = config
            .shutdown
            .watchdog_timeout(config.server.environment);
        Self {
            config,
            cache: CacheHandle::new(),
            connections: Arc::new(ConnectionTracker::new(watchdog)),
        }
    }
}
