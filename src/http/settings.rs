//! Connection settings and per-call options.
//!
//! # Responsibilities
//! - Hold the immutable defaults a transport client is built with
//! - Describe one call (method, path, query, headers, overrides)
//! - Overlay the two, key by key, into the effective `RequestInfo`
//!
//! # Design Decisions
//! - Options win over settings for every field they set
//! - Header names are lower-cased so overlays are case-insensitive
//! - Unknown pass-through fields ride along in `extra`

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::http::error::{RequestError, RequestResult};
use crate::http::query::{append_query, Query};
use crate::net::agent::AgentHandle;
use crate::net::url::parse_url;

/// Defaults a transport client is constructed with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Hostname without scheme.
    pub host: String,

    /// Use HTTPS.
    pub secure: bool,

    /// Explicit port; scheme default when unset.
    pub port: Option<u16>,

    /// Use the keep-alive agent (true) or the non-pooling agent.
    pub pooling: bool,

    /// Explicit agent, bypassing the runtime's pools.
    #[serde(skip)]
    pub agent: Option<AgentHandle>,

    /// Per-call timeout in milliseconds; 0 disables it.
    pub timeout_ms: Option<u64>,

    /// Verify TLS certificates (default true).
    pub reject_unauthorized: Option<bool>,

    /// Carried for resource clients; this layer never retries.
    pub max_retries: Option<u32>,

    /// Headers sent with every call.
    pub headers: BTreeMap<String, String>,

    /// Arbitrary pass-through fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            secure: true,
            port: None,
            pooling: true,
            agent: None,
            timeout_ms: None,
            reject_unauthorized: None,
            max_retries: None,
            headers: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

impl ConnectionSettings {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Build settings from a loose host string ("api.example.com:8443").
    pub fn from_url(input: &str) -> RequestResult<Self> {
        let parsed = parse_url(input)
            .ok_or_else(|| RequestError::invalid_argument(format!("invalid host: {:?}", input)))?;

        Ok(Self {
            host: parsed.host,
            secure: parsed.secure,
            port: parsed.port,
            ..Self::default()
        })
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_pooling(mut self, pooling: bool) -> Self {
        self.pooling = pooling;
        self
    }

    pub fn with_agent(mut self, agent: AgentHandle) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn with_reject_unauthorized(mut self, reject: bool) -> Self {
        self.reject_unauthorized = Some(reject);
        self
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Overlay per-call options onto these settings.
    pub fn merge(
        &self,
        method: Method,
        options: &RequestOptions,
        default_timeout_ms: u64,
    ) -> RequestResult<RequestInfo> {
        let host = options.host.clone().unwrap_or_else(|| self.host.clone());
        if host.trim().is_empty() {
            return Err(RequestError::invalid_argument("host is required"));
        }

        let base_path = options
            .path
            .as_deref()
            .or(options.pathname.as_deref())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| RequestError::invalid_argument("pathname is required"))?;
        let path = append_query(base_path, options.query.as_ref());

        let mut headers: BTreeMap<String, String> = self
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        for (name, value) in &options.headers {
            headers.insert(name.to_ascii_lowercase(), value.clone());
        }

        let mut extra = self.extra.clone();
        for (key, value) in &options.extra {
            extra.insert(key.clone(), value.clone());
        }

        Ok(RequestInfo {
            id: Uuid::new_v4(),
            method,
            host,
            port: options.port.or(self.port),
            secure: options.secure.unwrap_or(self.secure),
            path,
            headers,
            timeout_ms: options.timeout_ms.or(self.timeout_ms).unwrap_or(default_timeout_ms),
            pooling: options.pooling.unwrap_or(self.pooling),
            agent: options.agent.clone().or_else(|| self.agent.clone()),
            reject_unauthorized: options
                .reject_unauthorized
                .or(self.reject_unauthorized)
                .unwrap_or(true),
            max_retries: options.max_retries.or(self.max_retries),
            raw_stream: options.raw_stream,
            extra,
        })
    }
}

/// Parameters of a single call.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub pathname: Option<String>,
    /// Takes precedence over `pathname` when both are set.
    pub path: Option<String>,
    pub query: Option<Query>,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: Option<u64>,
    /// Resolve with the live response instead of a parsed body.
    pub raw_stream: bool,

    pub host: Option<String>,
    pub secure: Option<bool>,
    pub port: Option<u16>,
    pub pooling: Option<bool>,
    pub agent: Option<AgentHandle>,
    pub reject_unauthorized: Option<bool>,
    pub max_retries: Option<u32>,
    pub extra: Map<String, Value>,
}

impl RequestOptions {
    pub fn pathname(pathname: impl Into<String>) -> Self {
        Self {
            pathname: Some(pathname.into()),
            ..Self::default()
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn raw_stream(mut self) -> Self {
        self.raw_stream = true;
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = Some(secure);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn pooling(mut self, pooling: bool) -> Self {
        self.pooling = Some(pooling);
        self
    }

    pub fn agent(mut self, agent: AgentHandle) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn reject_unauthorized(mut self, reject: bool) -> Self {
        self.reject_unauthorized = Some(reject);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Effective options of one call: settings overlaid by options.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    /// Correlation id shared with the matching `ResponseContext`.
    pub id: Uuid,
    pub method: Method,
    pub host: String,
    pub port: Option<u16>,
    pub secure: bool,
    /// Path including the encoded query string.
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
    pub pooling: bool,
    pub agent: Option<AgentHandle>,
    pub reject_unauthorized: bool,
    pub max_retries: Option<u32>,
    pub raw_stream: bool,
    pub extra: Map<String, Value>,
}

impl RequestInfo {
    /// Absolute URL of the call.
    pub fn url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        let port = self.port.map(|p| format!(":{}", p)).unwrap_or_default();
        let slash = if self.path.starts_with('/') { "" } else { "/" };
        format!("{}://{}{}{}{}", scheme, self.host, port, slash, self.path)
    }

    /// Timeout as a duration, `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// Outbound payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Sent as-is.
    Text(String),
    /// Serialized with `serde_json`.
    Json(Value),
}

impl RequestBody {
    /// Serialize any value into a JSON body.
    pub fn json<T: Serialize>(value: &T) -> RequestResult<Self> {
        serde_json::to_value(value)
            .map(RequestBody::Json)
            .map_err(|e| RequestError::invalid_argument(format!("body is not serializable: {}", e)))
    }

    pub(crate) fn into_text(self) -> RequestResult<String> {
        match self {
            RequestBody::Text(text) => Ok(text),
            RequestBody::Json(value) => serde_json::to_string(&value)
                .map_err(|e| RequestError::invalid_argument(format!("body is not serializable: {}", e))),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
