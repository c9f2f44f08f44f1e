//! Host string parsing.
//!
//! # Responsibilities
//! - Accept loosely formatted host strings ("api.example.com", "localhost:8080",
//!   "http://10.0.0.1:3000/ignored")
//! - Default to HTTPS when no scheme is given
//! - Never fail loudly: unparseable input yields `None`

use serde::{Deserialize, Serialize};
use url::Url;

/// Host, port and transport security extracted from a host string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedUrl {
    /// Hostname without scheme or port.
    pub host: String,
    /// Explicit port, if one was present in the input.
    pub port: Option<u16>,
    /// True when the scheme is `https`.
    pub secure: bool,
}

/// Parse a host string into its connection parts.
///
/// Input without an `http://` or `https://` scheme is treated as HTTPS.
pub fn parse_url(input: &str) -> Option<ParsedUrl> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if has_http_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed = Url::parse(&candidate).ok()?;
    let host = parsed.host_str()?.to_string();

    Some(ParsedUrl {
        host,
        // `Url::port` hides the scheme default, which matches "no port given".
        port: parsed.port(),
        secure: parsed.scheme() == "https",
    })
}

fn has_http_scheme(input: &str) -> bool {
    let lower = input.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
