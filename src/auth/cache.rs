//! Token exchange and caching.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::auth::headers::{CLIENT_ID_HEADER, CLIENT_SECRET_HEADER};
use crate::auth::token::{Token, TokenEnvelope};
use crate::config::KeyServiceConfig;
use crate::http::error::{RequestError, RequestResult};
use crate::http::request::Request;
use crate::http::settings::{ConnectionSettings, RequestOptions};
use crate::net::runtime::TransportRuntime;
use crate::observability::metrics;

/// Exchanges client credentials for tokens and memoizes them until expiry.
///
/// Per client id the cache moves Absent → Cached → (expired) → Absent.
/// Expired entries are removed on the next lookup, before a new exchange.
#[derive(Debug, Clone)]
pub struct KeyProxy {
    request: Request,
    token_path: String,
    cache_tokens: bool,
    tokens: Arc<DashMap<String, Token>>,
    /// One lock per client id so concurrent misses share a single exchange.
    exchanges: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyProxy {
    /// Create a proxy that talks to the key service through `request`.
    pub fn new(request: Request, config: &KeyServiceConfig) -> Self {
        Self {
            request,
            token_path: config.token_path.clone(),
            cache_tokens: config.cache_tokens,
            tokens: Arc::new(DashMap::new()),
            exchanges: Arc::new(DashMap::new()),
        }
    }

    /// Build the key service client from configuration.
    pub fn from_config(config: &KeyServiceConfig, runtime: Arc<TransportRuntime>) -> RequestResult<Self> {
        let settings = ConnectionSettings::from_url(&config.host)?;
        Ok(Self::new(Request::new(settings, runtime), config))
    }

    /// The transport client used for exchanges.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Get a valid token for `client_id`, exchanging credentials when needed.
    pub async fn generate_token(&self, client_id: &str, secret: &str) -> RequestResult<Token> {
        if client_id.is_empty() {
            return Err(RequestError::invalid_argument("clientId is required"));
        }
        if secret.is_empty() {
            return Err(RequestError::invalid_argument("secret is required"));
        }

        if let Some(token) = self.lookup(client_id) {
            metrics::record_token_lookup(true);
            return Ok(token);
        }
        metrics::record_token_lookup(false);

        if !self.cache_tokens {
            return self.exchange(client_id, secret).await;
        }

        let lock = self
            .exchanges
            .entry(client_id.to_string())
            .or_default()
            .clone();
        let _guard = lock.lock().await;

        // A concurrent caller may have finished the exchange while we waited.
        let result = match self.lookup(client_id) {
            Some(token) => Ok(token),
            None => self.exchange(client_id, secret).await.inspect(|token| {
                self.tokens.insert(client_id.to_string(), token.clone());
                metrics::record_token_cache_size(self.tokens.len());
            }),
        };

        // Drop the lock entry unless another caller is queued on it
        // (one reference in the map, one held here).
        self.exchanges
            .remove_if(client_id, |_, entry| Arc::strong_count(entry) == 2);

        result
    }

    /// Client ids with an exchange lock currently allocated.
    pub(crate) fn pending_exchanges(&self) -> usize {
        self.exchanges.len()
    }

    /// Number of cached tokens, expired ones included.
    pub fn token_cache_size(&self) -> usize {
        self.tokens.len()
    }

    /// Drop the cached token for `client_id`. Returns true if one was cached.
    pub fn invalidate(&self, client_id: &str) -> bool {
        let removed = self.tokens.remove(client_id).is_some();
        metrics::record_token_cache_size(self.tokens.len());
        removed
    }

    /// Drop every cached token.
    pub fn clear(&self) {
        self.tokens.clear();
        self.exchanges.retain(|_, entry| Arc::strong_count(entry) > 1);
        metrics::record_token_cache_size(0);
    }

    /// Return a valid cached token, evicting an expired one.
    fn lookup(&self, client_id: &str) -> Option<Token> {
        let now = Utc::now();
        if self
            .tokens
            .remove_if(client_id, |_, token| !token.is_valid_at(now))
            .is_some()
        {
            tracing::debug!(client_id = %client_id, "Evicted expired token");
            metrics::record_token_cache_size(self.tokens.len());
            return None;
        }

        self.tokens.get(client_id).map(|entry| entry.value().clone())
    }

    async fn exchange(&self, client_id: &str, secret: &str) -> RequestResult<Token> {
        tracing::debug!(client_id = %client_id, path = %self.token_path, "Exchanging credentials for token");

        let options = RequestOptions::pathname(self.token_path.as_str())
            .header(CLIENT_ID_HEADER, client_id)
            .header(CLIENT_SECRET_HEADER, secret);

        let body = self.request.post(options, None).await.map_err(|e| {
            tracing::warn!(client_id = %client_id, error = %e, "Token exchange failed");
            e
        })?;

        let value = body.into_json().unwrap_or_default();
        let envelope: TokenEnvelope = serde_json::from_value(value.clone())
            .map_err(|source| RequestError::Shape { body: value, source })?;
        let token = envelope.token.normalized();

        tracing::info!(
            client_id = %client_id,
            expires = %token.expires,
            "Token issued"
        );

        Ok(token)
    }
}
