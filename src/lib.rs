//! Transport layer for the media API client.
//!
//! # Architecture Overview
//!
//! ```text
//!   Resource client (assets, uploads, ...)
//!        │  RequestOptions + body
//!        ▼
//!   ┌──────────┐   merge    ┌───────────────┐   agent   ┌──────────────────┐
//!   │  http    │──────────▶│  RequestInfo  │─────────▶│ net (agent pool) │──▶ API host
//!   │ Request  │◀──────────│ ResponseBody  │◀─────────│ reqwest::Client  │◀──
//!   └────┬─────┘  classify  └───────────────┘           └──────────────────┘
//!        │ observers
//!        ▼
//!   observability (tracing, metrics, broadcast)
//!
//!   auth::KeyProxy ── POST /v1/tokens ──▶ key service   (token cache)
//! ```

pub mod auth;
pub mod config;
pub mod http;
pub mod net;
pub mod observability;

pub use auth::{ensure_auth_headers, Credentials, KeyProxy, Token};
pub use config::ClientConfig;
pub use http::{
    ConnectionSettings, Query, Request, RequestBody, RequestError, RequestOptions, RequestResult,
    ResponseBody,
};
pub use net::{parse_url, TransportRuntime};
