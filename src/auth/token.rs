//! Bearer token representation.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Bookkeeping fields the key service adds that callers never need.
const STRIPPED_FIELDS: [&str; 2] = ["modified", "created"];

/// A short-lived credential issued for a client id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub client_id: String,
    pub token_id: String,
    #[serde(deserialize_with = "deserialize_expires")]
    pub expires: DateTime<Utc>,
    /// Any other fields returned by the key service.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Token {
    /// True while `expires` has not passed.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires >= now
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Drop server-side bookkeeping fields.
    pub(crate) fn normalized(mut self) -> Self {
        for field in STRIPPED_FIELDS {
            self.extra.remove(field);
        }
        self
    }
}

/// Response shape of the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenEnvelope {
    pub token: Token,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawExpires {
    Millis(i64),
    Fractional(f64),
    Text(String),
}

/// Accept RFC 3339 strings, numeric strings, or epoch milliseconds.
fn deserialize_expires<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let millis = match RawExpires::deserialize(deserializer)? {
        RawExpires::Millis(ms) => ms,
        RawExpires::Fractional(ms) => ms as i64,
        RawExpires::Text(text) => {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
                return Ok(parsed.with_timezone(&Utc));
            }
            text.parse::<i64>()
                .map_err(|_| D::Error::custom(format!("invalid expires timestamp: {}", text)))?
        }
    };

    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| D::Error::custom(format!("expires out of range: {}", millis)))
}
