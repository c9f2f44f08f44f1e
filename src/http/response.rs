//! Response handling.
//!
//! # Responsibilities
//! - Capture status and headers for observers and errors
//! - Represent buffered JSON, empty and raw streamed bodies
//!
//! # Design Decisions
//! - Raw streams are handed over untouched; the caller owns the body
//! - Header values that are not valid UTF-8 are dropped from the context

use std::collections::BTreeMap;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Chunked body of a raw streamed response.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Status and headers of a received response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseContext {
    /// Correlates with the `RequestInfo` of the same call.
    pub request_id: Uuid,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
}

impl ResponseContext {
    pub(crate) fn from_response(request_id: Uuid, response: &reqwest::Response) -> Self {
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            request_id,
            status_code: response.status().as_u16(),
            headers,
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Result of a successful transport call.
#[derive(Debug)]
pub enum ResponseBody {
    /// The response had no body.
    Empty,
    /// Parsed JSON body.
    Json(Value),
    /// Live response for callers that asked for `raw_stream`.
    Stream(RawStream),
}

impl ResponseBody {
    /// The JSON value, if this is a buffered JSON body.
    pub fn json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Consume into a JSON value. Empty bodies become an empty string.
    pub fn into_json(self) -> Option<Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Empty => Some(Value::String(String::new())),
            ResponseBody::Stream(_) => None,
        }
    }

    /// Deserialize a buffered JSON body into `T`.
    pub fn parse<T: serde::de::DeserializeOwned>(self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.into_json().unwrap_or(Value::Null))
    }

    pub fn into_stream(self) -> Option<RawStream> {
        match self {
            ResponseBody::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }
}

/// Unbuffered response body.
#[derive(Debug)]
pub struct RawStream {
    context: ResponseContext,
    response: reqwest::Response,
}

impl RawStream {
    pub(crate) fn new(context: ResponseContext, response: reqwest::Response) -> Self {
        Self { context, response }
    }

    pub fn context(&self) -> &ResponseContext {
        &self.context
    }

    /// Read the next chunk; `None` at end of stream.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, reqwest::Error> {
        self.response.chunk().await
    }

    /// Turn the body into a `Stream` of chunks for piping.
    pub fn into_byte_stream(self) -> ByteStream {
        Box::pin(self.response.bytes_stream())
    }

    /// Give up on streaming and take the underlying response.
    pub fn into_inner(self) -> reqwest::Response {
        self.response
    }
}
