//! Query string construction.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    List(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Single(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Single(value.to_string())
    }
}

impl<T: ToString> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::List(values.iter().map(ToString::to_string).collect())
    }
}

impl<T: ToString, const N: usize> From<[T; N]> for QueryValue {
    fn from(values: [T; N]) -> Self {
        QueryValue::List(values.iter().map(ToString::to_string).collect())
    }
}

/// Ordered query parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query(Vec<(String, QueryValue)>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter, replacing an existing one with the same key.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, QueryValue)> {
        self.0.iter()
    }

    /// Percent-encode into `k=v&...` form.
    ///
    /// Lists with more than one element are joined with commas into a single
    /// value first; shorter lists use repeated-key encoding. Spaces become
    /// `%20` and `~!'()*` stay literal.
    pub fn encode(&self) -> String {
        let mut pairs = Vec::new();
        for (key, value) in &self.0 {
            match value {
                QueryValue::Single(v) => pairs.push(encode_pair(key, v)),
                QueryValue::List(items) if items.len() > 1 => {
                    pairs.push(encode_pair(key, &items.join(",")));
                }
                QueryValue::List(items) => {
                    pairs.extend(items.iter().map(|item| encode_pair(key, item)));
                }
            }
        }
        pairs.join("&")
    }
}

fn encode_pair(key: &str, value: &str) -> String {
    format!("{}={}", escape(key), escape(value))
}

/// Escape one component. `form_urlencoded` writes a space as `+` (a literal
/// `+` is always `%2B`) and escapes a few marks that are safe here.
fn escape(component: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(component.as_bytes()).collect();
    encoded
        .replace('+', "%20")
        .replace("%7E", "~")
        .replace("%21", "!")
        .replace("%27", "'")
        .replace("%28", "(")
        .replace("%29", ")")
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Query::new(), |query, (k, v)| query.set(k, v))
    }
}

/// Append an encoded query to a path. Empty queries leave the path unchanged.
pub fn append_query(path: &str, query: Option<&Query>) -> String {
    match query {
        Some(q) if !q.is_empty() => {
            let encoded = q.encode();
            if encoded.is_empty() {
                path.to_string()
            } else {
                format!("{}?{}", path, encoded)
            }
        }
        _ => path.to_string(),
    }
}
