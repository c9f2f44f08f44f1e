//! Error definitions for transport calls.

use serde_json::Value;
use thiserror::Error;

use crate::http::response::ResponseContext;

/// Machine-readable transport failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCode {
    /// No response before the configured timeout.
    Timeout,
    /// Host name could not be resolved.
    HostNotFound,
    /// Connection refused or could not be established.
    ConnectionRefused,
    /// Connection dropped while sending or receiving.
    ConnectionReset,
    /// Any other failure while building or sending the request.
    Request,
}

impl TransportCode {
    /// Node-style error code string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportCode::Timeout => "ETIMEDOUT",
            TransportCode::HostNotFound => "ENOTFOUND",
            TransportCode::ConnectionRefused => "ECONNREFUSED",
            TransportCode::ConnectionReset => "ECONNRESET",
            TransportCode::Request => "EREQUEST",
        }
    }
}

impl std::fmt::Display for TransportCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// DNS, connect, reset and timeout failures.
#[derive(Debug, Error)]
#[error("{code}: {message}")]
pub struct TransportError {
    pub code: TransportCode,
    pub message: String,
    #[source]
    pub source: Option<reqwest::Error>,
}

impl TransportError {
    /// Timeout with no underlying client error.
    pub fn timeout(after_ms: u64) -> Self {
        Self {
            code: TransportCode::Timeout,
            message: format!("no response after {} ms", after_ms),
            source: None,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let code = classify(&err);
        Self {
            code,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

fn classify(err: &reqwest::Error) -> TransportCode {
    if err.is_timeout() {
        return TransportCode::Timeout;
    }

    // reqwest keeps the resolver/socket cause in the source chain only.
    let mut chain = String::new();
    let mut current: Option<&dyn std::error::Error> = Some(err);
    while let Some(e) = current {
        chain.push_str(&e.to_string().to_ascii_lowercase());
        chain.push(' ');
        current = e.source();
    }

    if chain.contains("dns error") || chain.contains("failed to lookup address") {
        TransportCode::HostNotFound
    } else if chain.contains("connection reset") || chain.contains("broken pipe") {
        TransportCode::ConnectionReset
    } else if err.is_connect() {
        TransportCode::ConnectionRefused
    } else if err.is_body() || err.is_decode() {
        TransportCode::ConnectionReset
    } else {
        TransportCode::Request
    }
}

/// Failure of a single transport call.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Missing or malformed parameter, raised before any network activity.
    #[error("{0}")]
    InvalidArgument(String),

    /// The request never produced a response.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// 2xx response whose body is not valid JSON.
    #[error("failed to parse response body: {source}")]
    Parse {
        body: String,
        context: ResponseContext,
        #[source]
        source: serde_json::Error,
    },

    /// 2xx JSON body that does not have the expected shape.
    #[error("unexpected response shape: {source}")]
    Shape {
        body: Value,
        #[source]
        source: serde_json::Error,
    },

    /// Status >= 400. `body` holds the parsed JSON when there was one.
    #[error("{}", application_message(.status, .body))]
    Application {
        status: u16,
        body: Option<Value>,
        context: ResponseContext,
    },
}

impl RequestError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        RequestError::InvalidArgument(message.into())
    }

    /// Human readable message; for application errors this is the body's `message`.
    pub fn message(&self) -> String {
        match self {
            RequestError::Application { status, body, .. } => application_message(status, body),
            other => other.to_string(),
        }
    }

    /// Status code by convention: the body's `statusCode`, else the HTTP status.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RequestError::Application { status, body, .. } => Some(
                body.as_ref()
                    .and_then(|b| b.get("statusCode"))
                    .and_then(Value::as_u64)
                    .and_then(|s| u16::try_from(s).ok())
                    .unwrap_or(*status),
            ),
            RequestError::Parse { context, .. } => Some(context.status_code),
            _ => None,
        }
    }

    /// Raw body text of a parse failure, or the parsed body of an application error.
    pub fn body(&self) -> Option<Value> {
        match self {
            RequestError::Parse { body, .. } => Some(Value::String(body.clone())),
            RequestError::Application { body, .. } => body.clone(),
            RequestError::Shape { body, .. } => Some(body.clone()),
            _ => None,
        }
    }

    /// Transport error code, if this is a transport failure.
    pub fn code(&self) -> Option<TransportCode> {
        match self {
            RequestError::Transport(e) => Some(e.code),
            _ => None,
        }
    }

    /// Response headers and status, when a response was received.
    pub fn context(&self) -> Option<&ResponseContext> {
        match self {
            RequestError::Parse { context, .. } | RequestError::Application { context, .. } => Some(context),
            _ => None,
        }
    }
}

fn application_message(status: &u16, body: &Option<Value>) -> String {
    body.as_ref()
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("request failed with status {}", status))
}

/// Result type for transport calls.
pub type RequestResult<T> = Result<T, RequestError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(status: u16) -> ResponseContext {
        ResponseContext {
            request_id: uuid::Uuid::nil(),
            status_code: status,
            headers: Default::default(),
        }
    }

    #[test]
    fn test_application_error_exposes_body_fields() {
        let err = RequestError::Application {
            status: 409,
            body: Some(json!({"message": "bad input", "statusCode": 409})),
            context: context(409),
        };
        assert_eq!(err.message(), "bad input");
        assert_eq!(err.to_string(), "bad input");
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(err.body(), Some(json!({"message": "bad input", "statusCode": 409})));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn test_application_error_without_body() {
        let err = RequestError::Application {
            status: 503,
            body: None,
            context: context(503),
        };
        assert_eq!(err.message(), "request failed with status 503");
        assert_eq!(err.status_code(), Some(503));
        assert_eq!(err.body(), None);
    }

    #[test]
    fn test_timeout_code() {
        let err = RequestError::from(TransportError::timeout(250));
        assert_eq!(err.code(), Some(TransportCode::Timeout));
        assert_eq!(err.to_string(), "transport failure: ETIMEDOUT: no response after 250 ms");
    }

    #[test]
    fn test_invalid_argument_message() {
        let err = RequestError::invalid_argument("clientId is required");
        assert_eq!(err.message(), "clientId is required");
        assert!(err.context().is_none());
    }
}
