//! HTTP transport subsystem.
//!
//! # Data Flow
//! ```text
//! Resource client call (options, body)
//!     → settings.rs (overlay options on ConnectionSettings → RequestInfo)
//!     → query.rs (encode query, append to path)
//!     → request.rs (body, headers, agent, send, timeout)
//!     → response.rs (context, JSON/empty/stream body)
//!     → error.rs (invalid argument, transport, parse, application)
//! ```

pub mod callback;
pub mod error;
pub mod query;
pub mod request;
pub mod response;
pub mod settings;

pub use callback::with_callback;
pub use error::{RequestError, RequestResult, TransportCode, TransportError};
pub use query::{Query, QueryValue};
pub use request::Request;
pub use response::{ByteStream, RawStream, ResponseBody, ResponseContext};
pub use settings::{ConnectionSettings, RequestBody, RequestInfo, RequestOptions};
