//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Transport call:
//!     → hooks.rs (on_request before send, on_response after headers)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → TracingObserver → logging.rs subscriber (stdout)
//!     → BroadcastObserver → resource client subscribers
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Observers replace event emitters; no runtime object mutation
//! - Request id flows from RequestInfo to ResponseContext
//! - Metrics are cheap no-ops until a recorder is installed

pub mod hooks;
pub mod logging;
pub mod metrics;

pub use hooks::{BroadcastObserver, Observers, RequestObserver, TracingObserver, TransportEvent};
