//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check hosts parse and value ranges make sense
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ClientConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use crate::config::schema::ClientConfig;
use crate::net::url::parse_url;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ClientConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.agents.max_sockets == 0 {
        errors.push(ValidationError::new("agents.max_sockets", "must be greater than 0"));
    }
    if config.agents.keep_alive_ms == 0 {
        errors.push(ValidationError::new("agents.keep_alive_ms", "must be greater than 0"));
    }

    if parse_url(&config.keys.host).is_none() {
        errors.push(ValidationError::new(
            "keys.host",
            format!("not a valid host: {:?}", config.keys.host),
        ));
    }
    if !config.keys.token_path.starts_with('/') {
        errors.push(ValidationError::new("keys.token_path", "must start with '/'"));
    }

    if config.connection.host.contains("://") {
        errors.push(ValidationError::new(
            "connection.host",
            "must be a bare hostname; set `secure` instead of a scheme",
        ));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {}", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
