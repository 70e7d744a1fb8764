//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (request timeout > 0, windows > 0)
//! - Check header names and values are sendable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address().parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.host",
            format!("{:?} is not a valid bind address", config.server.bind_address()),
        ));
    }
    if config.server.max_body_size == 0 {
        errors.push(ValidationError::new("server.max_body_size", "must be greater than 0"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be greater than 0",
        ));
    }

    let relay = &config.relay;
    if relay.allowed_domains.is_empty() {
        errors.push(ValidationError::new(
            "relay.allowed_domains",
            "at least one domain is required",
        ));
    }
    for domain in &relay.allowed_domains {
        if domain.trim().is_empty() {
            errors.push(ValidationError::new(
                "relay.allowed_domains",
                "entries must not be empty",
            ));
        }
    }
    for (name, value) in &relay.default_headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() {
            errors.push(ValidationError::new(
                "relay.default_headers",
                format!("{name:?} is not a valid header name"),
            ));
        }
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::new(
                "relay.default_headers",
                format!("value for {name:?} is not a valid header value"),
            ));
        }
    }

    let rate_limit = &config.rate_limit;
    if rate_limit.enabled {
        if rate_limit.window_secs == 0 {
            errors.push(ValidationError::new("rate_limit.window_secs", "must be greater than 0"));
        }
        if rate_limit.max_requests == 0 {
            errors.push(ValidationError::new("rate_limit.max_requests", "must be greater than 0"));
        }
        if rate_limit.purge_interval_secs == 0 {
            errors.push(ValidationError::new(
                "rate_limit.purge_interval_secs",
                "must be greater than 0",
            ));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a valid socket address", observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
