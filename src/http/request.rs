//! Transport client.
//!
//! # Responsibilities
//! - Merge call options over the client's connection settings
//! - Serialize the body and compute content headers
//! - Pick an agent and wait for a socket slot
//! - Send, buffer, parse, and classify the outcome
//! - Notify observers before send and after the response
//!
//! # Design Decisions
//! - One async API; callback users go through `callback::with_callback`
//! - The timeout covers sending and, for buffered calls, reading the body
//! - Status >= 400 is an application error even when the body is valid JSON

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use tokio::time::Instant as Deadline;

use crate::http::error::{RequestError, RequestResult, TransportError};
use crate::http::response::{RawStream, ResponseBody, ResponseContext};
use crate::http::settings::{ConnectionSettings, RequestBody, RequestInfo, RequestOptions};
use crate::net::agent::AgentHandle;
use crate::net::runtime::TransportRuntime;
use crate::observability::hooks::{Observers, RequestObserver};
use crate::observability::metrics;

/// Issues HTTP calls against one service.
#[derive(Debug, Clone)]
pub struct Request {
    settings: Arc<ConnectionSettings>,
    runtime: Arc<TransportRuntime>,
    observers: Observers,
}

impl Request {
    /// Create a client with fixed connection settings.
    pub fn new(settings: ConnectionSettings, runtime: Arc<TransportRuntime>) -> Self {
        Self {
            settings: Arc::new(settings),
            runtime,
            observers: Observers::new(),
        }
    }

    /// Register an observer for every call made by this client.
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// A copy of the connection settings. Changing it does not affect this client.
    pub fn settings(&self) -> ConnectionSettings {
        self.settings.as_ref().clone()
    }

    pub fn runtime(&self) -> &Arc<TransportRuntime> {
        &self.runtime
    }

    pub async fn get(&self, options: RequestOptions) -> RequestResult<ResponseBody> {
        self.send(Method::GET, options, None).await
    }

    pub async fn head(&self, options: RequestOptions) -> RequestResult<ResponseBody> {
        self.send(Method::HEAD, options, None).await
    }

    pub async fn delete(&self, options: RequestOptions) -> RequestResult<ResponseBody> {
        self.send(Method::DELETE, options, None).await
    }

    pub async fn put(
        &self,
        options: RequestOptions,
        data: Option<RequestBody>,
    ) -> RequestResult<ResponseBody> {
        self.send(Method::PUT, options, data).await
    }

    pub async fn post(
        &self,
        options: RequestOptions,
        data: Option<RequestBody>,
    ) -> RequestResult<ResponseBody> {
        self.send(Method::POST, options, data).await
    }

    /// Perform one call with an arbitrary method.
    pub async fn send(
        &self,
        method: Method,
        options: RequestOptions,
        data: Option<RequestBody>,
    ) -> RequestResult<ResponseBody> {
        let start = Instant::now();
        let mut info = self
            .settings
            .merge(method, &options, self.runtime.timeouts().request_ms)?;

        let body = data.map(RequestBody::into_text).transpose()?;
        if let Some(text) = &body {
            info.headers
                .insert("content-length".to_string(), text.len().to_string());
        }
        info.headers
            .entry("content-type".to_string())
            .or_insert_with(|| "application/json".to_string());

        let url = url::Url::parse(&info.url())
            .map_err(|e| RequestError::invalid_argument(format!("invalid url {}: {}", info.url(), e)))?;
        let headers = header_map(&info.headers)?;

        let agent = match info.agent.clone() {
            Some(agent) => agent,
            None => self
                .runtime
                .agent(info.secure, info.pooling, info.reject_unauthorized)?,
        };

        let mut builder = agent
            .client()
            .request(info.method.clone(), url)
            .headers(headers);
        if let Some(text) = body {
            builder = builder.body(text);
        }

        self.observers.request(&info);

        let result = self.execute(&agent, &info, builder, start).await;
        if let Err(RequestError::Transport(e)) = &result {
            tracing::warn!(
                request_id = %info.id,
                method = %info.method,
                url = %info.url(),
                code = %e.code,
                error = %e,
                "Transport failure"
            );
            metrics::record_request(info.method.as_str(), e.code.as_str(), start);
        }
        result
    }

    async fn execute(
        &self,
        agent: &AgentHandle,
        info: &RequestInfo,
        builder: reqwest::RequestBuilder,
        start: Instant,
    ) -> RequestResult<ResponseBody> {
        let deadline = info.timeout().map(|t| Deadline::now() + t);

        let _permit = within(deadline, info.timeout_ms, async { Ok::<_, reqwest::Error>(agent.acquire().await) }).await?;
        let response = within(deadline, info.timeout_ms, builder.send()).await?;

        let context = ResponseContext::from_response(info.id, &response);
        let status = context.status_code;

        if info.raw_stream && status < 400 {
            self.observers.response(&context);
            metrics::record_request(info.method.as_str(), &status.to_string(), start);
            return Ok(ResponseBody::Stream(RawStream::new(context, response)));
        }

        // A failed body read is recorded once, by `send`, under its transport code.
        let bytes = within(deadline, info.timeout_ms, response.bytes()).await?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        self.observers.response(&context);
        metrics::record_request(info.method.as_str(), &status.to_string(), start);

        classify(status, text, context)
    }
}

/// Turn a buffered response into a body or an error.
fn classify(status: u16, text: String, context: ResponseContext) -> RequestResult<ResponseBody> {
    if status >= 400 {
        let body = if text.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<Value>(&text).ok()
        };
        return Err(RequestError::Application { status, body, context });
    }

    if text.is_empty() {
        return Ok(ResponseBody::Empty);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Ok(ResponseBody::Json(value)),
        Err(source) => Err(RequestError::Parse {
            body: text,
            context,
            source,
        }),
    }
}

async fn within<T, F>(deadline: Option<Deadline>, timeout_ms: u64, fut: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, reqwest::Error>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| TransportError::timeout(timeout_ms))?
            .map_err(TransportError::from),
        None => fut.await.map_err(TransportError::from),
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> RequestResult<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RequestError::invalid_argument(format!("invalid header name: {}", name)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| RequestError::invalid_argument(format!("invalid header value for {}", name)))?;
        map.insert(name, value);
    }
    Ok(map)
}

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
    fn test_classify_json_success() {
        let body = classify(200, r#"{"id":1}"#.into(), context(200)).unwrap();
        assert_eq!(body.json(), Some(&json!({"id": 1})));
    }

    #[test]
    fn test_classify_empty_success() {
        assert!(classify(204, String::new(), context(204)).unwrap().is_empty());
    }

    #[test]
    fn test_classify_non_json_success_is_parse_error() {
        match classify(200, "<html>".into(), context(200)).unwrap_err() {
            RequestError::Parse { body, context, .. } => {
                assert_eq!(body, "<html>");
                assert_eq!(context.status_code, 200);
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_error_status_with_json() {
        let err = classify(409, r#"{"message":"bad input","statusCode":409}"#.into(), context(409))
            .unwrap_err();
        assert!(matches!(err, RequestError::Application { status: 409, .. }));
        assert_eq!(err.message(), "bad input");
        assert_eq!(err.body(), Some(json!({"message": "bad input", "statusCode": 409})));
    }

    #[test]
    fn test_classify_error_status_without_json() {
        let err = classify(502, "Bad Gateway".into(), context(502)).unwrap_err();
        assert!(matches!(err, RequestError::Application { status: 502, body: None, .. }));
    }

    #[test]
    fn test_header_map_rejects_invalid_names() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());
        assert!(matches!(header_map(&headers), Err(RequestError::InvalidArgument(_))));
    }

    #[test]
    fn test_settings_returns_copy() {
        let request = Request::new(
            ConnectionSettings::new("api.example.com"),
            Arc::new(TransportRuntime::default()),
        );
        let mut copy = request.settings();
        copy.host = "changed".into();
        assert_eq!(request.settings().host, "api.example.com");
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_before_network() {
        let request = Request::new(ConnectionSettings::default(), Arc::new(TransportRuntime::default()));
        let err = request.get(RequestOptions::pathname("/v1/items")).await.unwrap_err();
        assert_eq!(err.message(), "host is required");
        assert_eq!(request.runtime().agents().initialized_count(), 0);
    }
}
