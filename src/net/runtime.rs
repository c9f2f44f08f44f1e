//! Transport runtime: the explicit owner of agent pools.

use std::sync::{Arc, OnceLock};

use crate::config::{AgentPoolConfig, TimeoutConfig};
use crate::http::error::TransportError;
use crate::net::agent::{AgentHandle, AgentPool};

static GLOBAL_RUNTIME: OnceLock<Arc<TransportRuntime>> = OnceLock::new();

/// Shared state for every transport client built from it.
///
/// Construct one at the composition root and hand clones of the `Arc` to
/// each resource client so sockets are reused across all of them.
#[derive(Debug)]
pub struct TransportRuntime {
    agents: AgentPool,
    unverified: AgentPool,
    timeouts: TimeoutConfig,
}

impl TransportRuntime {
    /// Create a runtime with the given pool and timeout configuration.
    pub fn new(agents: AgentPoolConfig, timeouts: TimeoutConfig) -> Self {
        Self {
            agents: AgentPool::new(agents.clone()),
            unverified: AgentPool::unverified(agents),
            timeouts,
        }
    }

    /// Process-wide runtime with default configuration, built on first use.
    pub fn global() -> Arc<TransportRuntime> {
        GLOBAL_RUNTIME
            .get_or_init(|| Arc::new(TransportRuntime::default()))
            .clone()
    }

    /// Select the agent for a call.
    ///
    /// Calls that disable certificate verification are served from a
    /// separate pool so verified connections are never reused for them.
    pub fn agent(&self, secure: bool, pooling: bool, verify_certs: bool) -> Result<AgentHandle, TransportError> {
        if verify_certs {
            self.agents.get_agent(secure, pooling)
        } else {
            self.unverified.get_agent(secure, pooling)
        }
    }

    /// Verified agent pool.
    pub fn agents(&self) -> &AgentPool {
        &self.agents
    }

    /// Timeout defaults.
    pub fn timeouts(&self) -> &TimeoutConfig {
        &self.timeouts
    }
}

impl Default for TransportRuntime {
    fn default() -> Self {
        Self::new(AgentPoolConfig::default(), TimeoutConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_is_shared() {
        let a = TransportRuntime::global();
        let b = TransportRuntime::global();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.agent(true, true, true).unwrap().ptr_eq(&b.agent(false, true, true).unwrap()));
    }

    #[test]
    fn test_unverified_agents_are_separate() {
        let runtime = TransportRuntime::default();
        let verified = runtime.agent(true, true, true).unwrap();
        let unverified = runtime.agent(true, true, false).unwrap();
        assert!(!verified.ptr_eq(&unverified));
        assert!(unverified.ptr_eq(&runtime.agent(true, true, false).unwrap()));
    }
}
