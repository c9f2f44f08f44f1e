//! Connection pool ("agent") handles.
//!
//! # Responsibilities
//! - Build at most one keep-alive handle and one non-pooling handle
//! - Hand out the same handle on every lookup for a pooling mode
//! - Bound concurrently open sockets on the keep-alive handle
//!
//! # Design Decisions
//! - Slots are keyed by pooling mode only. `is_secure` is recorded when a
//!   slot is first built and ignored afterwards, so secure and plain calls
//!   share a handle.
//! - Lazy construction goes through `OnceLock`, so racing first callers
//!   observe a single instance.
//! - Redirects are never followed.

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::config::AgentPoolConfig;
use crate::http::error::TransportError;

/// Cloneable reference to a connection pool.
#[derive(Clone)]
pub struct AgentHandle {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    client: reqwest::Client,
    pooling: bool,
    secure: bool,
    sockets: Option<Semaphore>,
}

impl AgentHandle {
    fn build(
        config: &AgentPoolConfig,
        secure: bool,
        pooling: bool,
        verify_certs: bool,
    ) -> Result<Self, reqwest::Error> {
        // Each call is one request on the wire; 3xx is returned to the caller.
        let mut builder = reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());

        builder = if pooling {
            builder
                .tcp_keepalive(Duration::from_millis(config.keep_alive_ms))
                .pool_idle_timeout(Duration::from_millis(config.keep_alive_ms))
                .pool_max_idle_per_host(config.max_free_sockets)
        } else {
            builder.pool_max_idle_per_host(0)
        };

        if config.connect_timeout_ms > 0 {
            builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
        }
        if !verify_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder.build()?;

        let sockets = (pooling && config.max_sockets > 0).then(|| Semaphore::new(config.max_sockets));

        tracing::debug!(
            pooling,
            secure,
            verify_certs,
            max_sockets = config.max_sockets,
            "Agent handle created"
        );

        Ok(Self {
            inner: Arc::new(AgentInner {
                client,
                pooling,
                secure,
                sockets,
            }),
        })
    }

    /// The underlying HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.inner.client
    }

    /// True for the keep-alive handle.
    pub fn is_pooling(&self) -> bool {
        self.inner.pooling
    }

    /// The `is_secure` flag seen when this handle was built.
    pub fn built_secure(&self) -> bool {
        self.inner.secure
    }

    /// Socket permits currently available, if this handle limits sockets.
    pub fn available_sockets(&self) -> Option<usize> {
        self.inner.sockets.as_ref().map(Semaphore::available_permits)
    }

    /// Wait for a socket slot. Handles without a limit return immediately.
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        match &self.inner.sockets {
            // The semaphore is never closed, so acquire only fails after close().
            Some(sockets) => sockets.acquire().await.ok(),
            None => None,
        }
    }

    /// Referential identity: true when both handles share one pool.
    pub fn ptr_eq(&self, other: &AgentHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("pooling", &self.inner.pooling)
            .field("secure", &self.inner.secure)
            .field("available_sockets", &self.available_sockets())
            .finish()
    }
}

/// Two lazily built agent slots: keep-alive and default.
#[derive(Debug)]
pub struct AgentPool {
    config: AgentPoolConfig,
    verify_certs: bool,
    keep_alive: OnceLock<AgentHandle>,
    default: OnceLock<AgentHandle>,
}

impl AgentPool {
    /// Create an empty pool. Handles are built on first use.
    pub fn new(config: AgentPoolConfig) -> Self {
        Self::with_verification(config, true)
    }

    /// Create a pool whose handles skip TLS certificate verification.
    pub fn unverified(config: AgentPoolConfig) -> Self {
        Self::with_verification(config, false)
    }

    fn with_verification(config: AgentPoolConfig, verify_certs: bool) -> Self {
        Self {
            config,
            verify_certs,
            keep_alive: OnceLock::new(),
            default: OnceLock::new(),
        }
    }

    /// Get the handle for a pooling mode, building it on first use.
    ///
    /// A failed build leaves the slot empty and is reported to the caller.
    pub fn get_agent(&self, is_secure: bool, allow_pooling: bool) -> Result<AgentHandle, TransportError> {
        let slot = if allow_pooling {
            &self.keep_alive
        } else {
            &self.default
        };

        get_or_build(slot, || {
            AgentHandle::build(&self.config, is_secure, allow_pooling, self.verify_certs)
        })
        .map_err(|e| {
            tracing::error!(error = %e, pooling = allow_pooling, "Failed to build agent client");
            TransportError::from(e)
        })
    }

    /// Number of slots that have been built so far.
    pub fn initialized_count(&self) -> usize {
        usize::from(self.keep_alive.get().is_some()) + usize::from(self.default.get().is_some())
    }
}

/// Fill `slot` on first success. Racing builders may each run `build`, but
/// only the first stored handle is ever returned.
fn get_or_build<E>(
    slot: &OnceLock<AgentHandle>,
    build: impl FnOnce() -> Result<AgentHandle, E>,
) -> Result<AgentHandle, E> {
    if let Some(handle) = slot.get() {
        return Ok(handle.clone());
    }
    let built = build()?;
    Ok(slot.get_or_init(|| built).clone())
}

impl Default for AgentPool {
    fn default() -> Self {
        Self::new(AgentPoolConfig::default())
    }
}
