//! Authentication headers for resource calls.

use std::collections::BTreeMap;

use crate::auth::cache::KeyProxy;
use crate::http::error::RequestResult;

pub const CLIENT_ID_HEADER: &str = "x-client-id";
pub const CLIENT_SECRET_HEADER: &str = "x-client-secret";
pub const AUTH_TOKEN_HEADER: &str = "x-authentication-token";

/// What a resource client knows about its caller.
#[derive(Clone, Default)]
pub struct Credentials {
    pub client_id: String,
    pub secret: Option<String>,
    /// Pre-issued token id; skips the key service when set.
    pub token: Option<String>,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: Some(secret.into()),
            token: None,
        }
    }

    pub fn with_token(client_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: None,
            token: Some(token.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Produce `x-client-id` and `x-authentication-token` for a call.
///
/// A pre-issued token is used as-is; otherwise one is obtained (or reused
/// from cache) through `keys`.
pub async fn ensure_auth_headers(
    keys: &KeyProxy,
    credentials: &Credentials,
) -> RequestResult<BTreeMap<String, String>> {
    let token_id = match &credentials.token {
        Some(token) if !token.is_empty() => token.clone(),
        _ => {
            let secret = credentials.secret.as_deref().unwrap_or_default();
            keys.generate_token(&credentials.client_id, secret)
                .await?
                .token_id
        }
    };

    let mut headers = BTreeMap::new();
    headers.insert(CLIENT_ID_HEADER.to_string(), credentials.client_id.clone());
    headers.insert(AUTH_TOKEN_HEADER.to_string(), token_id);
    Ok(headers)
}
