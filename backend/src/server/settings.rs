//! Server settings loaded via OrthoConfig.
//!
//! Values layer from configuration files, `SQUAWKER_*` environment variables
//! and command-line flags. Unset values fall back to the defaults below.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 20;
/// Longest accepted rate limit window: one day.
const MAX_RATE_LIMIT_WINDOW_SECS: u64 = 86_400;
const DEFAULT_CACHE_PURGE_INTERVAL_SECS: u64 = 60;

/// Settings controlling the HTTP listener and admission behaviour.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SQUAWKER")]
pub struct ServerSettings {
    /// Interface address to bind.
    pub host: Option<String>,
    /// TCP port to bind.
    pub port: Option<u16>,
    /// Seconds an author must wait between squawks.
    pub rate_limit_window_secs: Option<u64>,
    /// Seconds between sweeps of expired rate limiter entries.
    pub cache_purge_interval_secs: Option<u64>,
}

impl ServerSettings {
    /// Socket address built from `host` and `port`.
    ///
    /// # Errors
    /// Returns [`std::io::Error`] when `host` is not an IP address.
    pub fn bind_addr(&self) -> std::io::Result<SocketAddr> {
        let host = self.host.as_deref().unwrap_or(DEFAULT_HOST);
        let ip: IpAddr = host.parse().map_err(|err| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid host {host:?}: {err}"),
            )
        })?;
        Ok(SocketAddr::new(ip, self.port.unwrap_or(DEFAULT_PORT)))
    }

    /// How long an admitted squawk blocks its author.
    ///
    /// # Errors
    /// Returns [`std::io::Error`] when the window exceeds one day.
    pub fn rate_limit_window(&self) -> std::io::Result<Duration> {
        let secs = self
            .rate_limit_window_secs
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECS);
        if secs > MAX_RATE_LIMIT_WINDOW_SECS {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!(
                    "rate limit window of {secs}s exceeds the maximum of {MAX_RATE_LIMIT_WINDOW_SECS}s"
                ),
            ));
        }
        Ok(Duration::from_secs(secs))
    }

    /// Period of the expired-entry sweep. Zero falls back to the default.
    pub fn cache_purge_interval(&self) -> Duration {
        let secs = self
            .cache_purge_interval_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CACHE_PURGE_INTERVAL_SECS);
        Duration::from_secs(secs)
    }
}
