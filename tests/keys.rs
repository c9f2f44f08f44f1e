//! Token exchange against a mocked key service.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use media_api_client::auth::{ensure_auth_headers, Credentials, KeyProxy};
use media_api_client::config::KeyServiceConfig;
use media_api_client::TransportRuntime;

fn token_body(expires: &str) -> Value {
    json!({
        "token": {
            "clientId": "client-1",
            "tokenId": "tok-1",
            "expires": expires,
            "created": "2026-01-01T00:00:00Z",
            "modified": "2026-01-01T00:00:00Z",
            "scope": "read"
        }
    })
}

fn proxy_for(server: &MockServer, cache_tokens: bool) -> KeyProxy {
    let config = KeyServiceConfig {
        host: server.uri(),
        cache_tokens,
        ..KeyServiceConfig::default()
    };
    KeyProxy::from_config(&config, Arc::new(TransportRuntime::default())).unwrap()
}

fn in_an_hour() -> String {
    (Utc::now() + ChronoDuration::hours(1)).to_rfc3339()
}

#[tokio::test]
async fn test_second_call_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/tokens"))
        .and(header("x-client-id", "client-1"))
        .and(header("x-client-secret", "s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&in_an_hour())))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = proxy_for(&server, true);
    let first = proxy.generate_token("client-1", "s3cret").await.unwrap();
    let second = proxy.generate_token("client-1", "s3cret").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.token_id, "tok-1");
    assert_eq!(first.extra.get("scope"), Some(&json!("read")));
    assert!(!first.extra.contains_key("created"));
    assert!(!first.extra.contains_key("modified"));
    assert_eq!(proxy.token_cache_size(), 1);
}

#[tokio::test]
async fn test_expired_token_is_exchanged_again() {
    let server = MockServer::start().await;
    let expired = (Utc::now() - ChronoDuration::seconds(5)).to_rfc3339();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&expired)))
        .expect(2)
        .mount(&server)
        .await;

    let proxy = proxy_for(&server, true);
    proxy.generate_token("client-1", "s3cret").await.unwrap();
    proxy.generate_token("client-1", "s3cret").await.unwrap();

    assert_eq!(proxy.token_cache_size(), 1);
}

#[tokio::test]
async fn test_concurrent_misses_share_one_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body(&in_an_hour()))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let proxy = proxy_for(&server, true);
    let (a, b) = tokio::join!(
        proxy.generate_token("client-1", "s3cret"),
        proxy.generate_token("client-1", "s3cret"),
    );

    assert_eq!(a.unwrap().token_id, b.unwrap().token_id);
}

#[tokio::test]
async fn test_failed_exchange_caches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "invalid secret" })))
        .mount(&server)
        .await;

    let proxy = proxy_for(&server, true);
    let err = proxy.generate_token("client-1", "wrong").await.unwrap_err();

    assert_eq!(err.message(), "invalid secret");
    assert_eq!(err.status_code(), Some(401));
    assert_eq!(proxy.token_cache_size(), 0);
}

#[tokio::test]
async fn test_wrong_shape_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&server)
        .await;

    let proxy = proxy_for(&server, true);
    let err = proxy.generate_token("client-1", "s3cret").await.unwrap_err();

    assert_eq!(err.body(), Some(json!({ "unexpected": true })));
    assert_eq!(proxy.token_cache_size(), 0);
}

#[tokio::test]
async fn test_caching_disabled_exchanges_every_time() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&in_an_hour())))
        .expect(2)
        .mount(&server)
        .await;

    let proxy = proxy_for(&server, false);
    proxy.generate_token("client-1", "s3cret").await.unwrap();
    proxy.generate_token("client-1", "s3cret").await.unwrap();

    assert_eq!(proxy.token_cache_size(), 0);
}

#[tokio::test]
async fn test_numeric_expiry_is_accepted() {
    let server = MockServer::start().await;
    let millis = (Utc::now() + ChronoDuration::hours(1)).timestamp_millis();
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": { "clientId": "client-1", "tokenId": "tok-2", "expires": millis }
        })))
        .mount(&server)
        .await;

    let token = proxy_for(&server, true)
        .generate_token("client-1", "s3cret")
        .await
        .unwrap();

    assert_eq!(token.expires.timestamp_millis(), millis);
    assert!(token.is_valid());
}

#[tokio::test]
async fn test_auth_headers_from_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body(&in_an_hour())))
        .expect(1)
        .mount(&server)
        .await;

    let proxy = proxy_for(&server, true);
    let headers = ensure_auth_headers(&proxy, &Credentials::new("client-1", "s3cret"))
        .await
        .unwrap();

    assert_eq!(headers.get("x-client-id").map(String::as_str), Some("client-1"));
    assert_eq!(headers.get("x-authentication-token").map(String::as_str), Some("tok-1"));
}
