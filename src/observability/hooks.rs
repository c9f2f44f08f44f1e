//! Request/response observers.
//!
//! # Responsibilities
//! - Notify subscribers before a request is written
//! - Notify subscribers once a response head arrives
//! - Provide built-in observers for logging and fan-out
//!
//! # Design Decisions
//! - Observers are plain trait objects passed at construction
//! - Hooks are synchronous and must not block; forward to a channel for async work
//! - Transport failures produce no response notification (there is no response)

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::http::response::ResponseContext;
use crate::http::settings::RequestInfo;

/// Hook pair invoked around every transport call.
pub trait RequestObserver: Send + Sync {
    /// Called with the fully merged options before the request is sent.
    fn on_request(&self, _info: &RequestInfo) {}

    /// Called with status and headers as soon as a response is received.
    fn on_response(&self, _context: &ResponseContext) {}
}

/// Logs every call through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RequestObserver for TracingObserver {
    fn on_request(&self, info: &RequestInfo) {
        tracing::debug!(
            request_id = %info.id,
            method = %info.method,
            url = %info.url(),
            timeout_ms = info.timeout_ms,
            pooling = info.pooling,
            raw_stream = info.raw_stream,
            "Issuing request"
        );
    }

    fn on_response(&self, context: &ResponseContext) {
        if context.status_code >= 400 {
            tracing::warn!(
                request_id = %context.request_id,
                status = context.status_code,
                "Request failed with error status"
            );
        } else {
            tracing::debug!(
                request_id = %context.request_id,
                status = context.status_code,
                "Response received"
            );
        }
    }
}

/// Event published by `BroadcastObserver`.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Request(RequestInfo),
    Response(ResponseContext),
}

/// Re-publishes hooks on a broadcast channel.
///
/// Resource clients hold one of these and expose `subscribe()` so their
/// own callers can watch traffic without touching call sites.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<TransportEvent>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastObserver {
    fn default() -> Self {
        Self::new(64)
    }
}

impl RequestObserver for BroadcastObserver {
    fn on_request(&self, info: &RequestInfo) {
        // No subscribers is not an error.
        let _ = self.tx.send(TransportEvent::Request(info.clone()));
    }

    fn on_response(&self, context: &ResponseContext) {
        let _ = self.tx.send(TransportEvent::Response(context.clone()));
    }
}

/// Ordered set of observers sharing one notification point.
#[derive(Clone, Default)]
pub struct Observers {
    inner: Vec<Arc<dyn RequestObserver>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: Arc<dyn RequestObserver>) {
        self.inner.push(observer);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn request(&self, info: &RequestInfo) {
        for observer in &self.inner {
            observer.on_request(info);
        }
    }

    pub fn response(&self, context: &ResponseContext) {
        for observer in &self.inner {
            observer.on_response(context);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers").field("count", &self.inner.len()).finish()
    }
}
