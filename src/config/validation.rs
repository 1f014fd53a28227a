//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check the reservation and every static registration
//! - Validate value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: HostConfig → Result<(), Vec<ValidationError>>
//! - Runs before the config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::HostConfig;
use crate::embedded::ResourceNamespace;
use crate::routing::AddressReservation;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.reservation: {0}")]
    Reservation(String),

    #[error("listener.max_connections must be greater than zero")]
    ZeroConnections,

    #[error("static_files[{index}]: {reason}")]
    StaticFile { index: usize, reason: String },

    #[error("observability.log_level '{0}' is not a known level")]
    LogLevel(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate `config`, reporting every problem found.
pub fn validate_config(config: &HostConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.listener.reservation.parse::<AddressReservation>() {
        errors.push(ValidationError::Reservation(e.to_string()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroConnections);
    }

    for (index, entry) in config.static_files.iter().enumerate() {
        if !entry.path_prefix.starts_with('/') {
            errors.push(ValidationError::StaticFile {
                index,
                reason: format!("path_prefix '{}' must start with '/'", entry.path_prefix),
            });
        }
        if let Err(e) = entry.namespace.parse::<ResourceNamespace>() {
            errors.push(ValidationError::StaticFile {
                index,
                reason: e.to_string(),
            });
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::LogLevel(config.observability.log_level.clone()));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
