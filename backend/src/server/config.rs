//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::time::Duration;

use squawker::domain::RATE_LIMIT_WINDOW;

use super::settings::ServerSettings;

const DEFAULT_CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) rate_limit_window: Duration,
    pub(crate) cache_purge_interval: Duration,
}

impl ServerConfig {
    /// Construct a configuration binding `bind_addr` with default admission
    /// settings.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            rate_limit_window: RATE_LIMIT_WINDOW,
            cache_purge_interval: DEFAULT_CACHE_PURGE_INTERVAL,
        }
    }

    /// Construct a configuration from loaded settings.
    ///
    /// # Errors
    /// Returns [`std::io::Error`] when the bind address or the rate limit
    /// window is invalid.
    pub fn from_settings(settings: &ServerSettings) -> std::io::Result<Self> {
        Ok(Self::new(settings.bind_addr()?)
            .with_rate_limit_window(settings.rate_limit_window()?)
            .with_cache_purge_interval(settings.cache_purge_interval()))
    }

    /// Override how long an admitted squawk blocks its author.
    #[must_use]
    pub fn with_rate_limit_window(mut self, window: Duration) -> Self {
        self.rate_limit_window = window;
        self
    }

    /// Override the expired-entry sweep period.
    #[must_use]
    pub fn with_cache_purge_interval(mut self, interval: Duration) -> Self {
        self.cache_purge_interval = interval;
        self
    }
}
