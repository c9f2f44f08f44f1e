//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Host string from config or caller
//!     → url.rs (host, port, secure; HTTPS by default)
//!
//! Transport call
//!     → runtime.rs (owner of agent pools)
//!     → agent.rs (keep-alive or default handle, socket permit)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - One keep-alive and one non-pooling handle per runtime
//! - Runtime is injectable; a process-wide default exists for convenience
//! - Parsing never panics on bad input

pub mod agent;
pub mod runtime;
pub mod url;

pub use agent::{AgentHandle, AgentPool};
pub use runtime::TransportRuntime;
pub use self::url::{parse_url, ParsedUrl};
