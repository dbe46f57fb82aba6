//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, header cap within hyper's bounds)
//! - Check the bind address parses as a socket address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SinkConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{SinkConfig, MIN_HEADER_BYTES};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    NoConnections,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("limits.max_header_bytes must be at least {min}, got {actual}")]
    HeaderLimitTooSmall { min: usize, actual: usize },

    #[error("limits.max_header_bytes must fit in 32 bits, got {0}")]
    HeaderLimitTooLarge(usize),

    #[error("logging.extra_sensitive_headers contains an empty name")]
    EmptySensitiveHeader,
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &SinkConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.listener.max_connections == 0 {
        errors.push(ValidationError::NoConnections);
    }

    if config.timeouts.read_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("read_secs"));
    }
    if config.timeouts.write_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("write_secs"));
    }

    let max = config.limits.max_header_bytes;
    if max < MIN_HEADER_BYTES {
        errors.push(ValidationError::HeaderLimitTooSmall {
            min: MIN_HEADER_BYTES,
            actual: max,
        });
    } else if u32::try_from(max).is_err() {
        errors.push(ValidationError::HeaderLimitTooLarge(max));
    }

    if config
        .logging
        .extra_sensitive_headers
        .iter()
        .any(|name| name.trim().is_empty())
    {
        errors.push(ValidationError::EmptySensitiveHeader);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
