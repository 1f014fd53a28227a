//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every
//! field has a default, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the host.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Listener configuration (reservation, backpressure).
    pub listener: ListenerConfig,

    /// Caching headers for embedded resources.
    pub static_cache: StaticCacheConfig,

    /// Static registrations, tried in the order listed.
    pub static_files: Vec<StaticFileConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Address reservation, e.g. `http://+:8655/`.
    pub reservation: String,

    /// Maximum concurrently open connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            reservation: "http://+:8655/".to_string(),
            max_connections: 10_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticCacheConfig {
    /// `Expires` horizon for embedded resources, in days.
    pub expires_days: u64,
}

impl Default for StaticCacheConfig {
    fn default() -> Self {
        Self { expires_days: 30 }
    }
}

impl StaticCacheConfig {
    pub fn expires_after(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.expires_days * 24 * 60 * 60)
    }
}

/// One static registration: URL prefix → resource namespace.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct StaticFileConfig {
    /// URL path prefix, e.g. `/Scripts`.
    pub path_prefix: String,

    /// Dotted resource namespace, e.g. `SampleApp.Scripts`.
    pub namespace: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
