//! Key service integration.
//!
//! # Data Flow
//! ```text
//! Resource client needs auth headers
//!     → headers.rs (pre-issued token, or ask the key proxy)
//!     → cache.rs (valid cached token? return it without I/O)
//!     → cache.rs (miss/expired: evict, POST credentials, cache result)
//!     → token.rs (normalize: strip bookkeeping, parse expiry)
//! ```
//!
//! # Security Constraints
//! - Secrets and token ids are never logged
//! - A failed exchange leaves no token behind

pub mod cache;
pub mod headers;
pub mod token;

pub use cache::KeyProxy;
pub use headers::{ensure_auth_headers, Credentials};
pub use token::Token;
