//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::http::settings::ConnectionSettings;

/// Root configuration for the API client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Default connection settings for resource clients.
    pub connection: ConnectionSettings,

    /// Connection pool ("agent") parameters.
    pub agents: AgentPoolConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Key service (token exchange) settings.
    pub keys: KeyServiceConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Parameters used when an agent handle is first constructed.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentPoolConfig {
    /// TCP keep-alive interval for pooled sockets in milliseconds.
    pub keep_alive_ms: u64,

    /// Maximum sockets open at once through the keep-alive handle.
    pub max_sockets: usize,

    /// Maximum idle sockets retained per host by the keep-alive handle.
    pub max_free_sockets: usize,

    /// Connection establishment timeout in milliseconds (0 = none).
    pub connect_timeout_ms: u64,
}

impl Default for AgentPoolConfig {
    fn default() -> Self {
        Self {
            keep_alive_ms: 60_000,
            max_sockets: 32,
            max_free_sockets: 32,
            connect_timeout_ms: 0,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Per-call timeout applied when neither settings nor options set one.
    pub request_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_ms: 30_000 }
    }
}

/// Key service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KeyServiceConfig {
    /// Host string of the key service (parsed with `parse_url`).
    pub host: String,

    /// Path of the token exchange endpoint.
    pub token_path: String,

    /// Memoize issued tokens until they expire.
    pub cache_tokens: bool,
}

impl Default for KeyServiceConfig {
    fn default() -> Self {
        Self {
            host: "keysvc.example.com".to_string(),
            token_path: "/v1/tokens".to_string(),
            cache_tokens: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log every request/response through `tracing`.
    pub log_requests: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_requests: true,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
