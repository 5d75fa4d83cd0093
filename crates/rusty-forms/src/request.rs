// File: src/request.rs
// Purpose: Request-shaped input (body, query, files) that form models parse from

use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// One section of a request: external field identifier → raw value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestBag {
    params: HashMap<String, Value>,
}

impl RequestBag {
    /// Create from HashMap
    pub fn new(params: HashMap<String, Value>) -> Self {
        Self { params }
    }

    /// Parse a url-encoded query string (`a=1&b=two%20words`).
    ///
    /// Pairs that fail to decode are skipped; `+` is read as a space.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = HashMap::new();

        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(&key.replace('+', " ")).map(|k| k.into_owned());
            let value = urlencoding::decode(&value.replace('+', " ")).map(|v| v.into_owned());
            match (key, value) {
                (Ok(key), Ok(value)) => {
                    params.insert(key, Value::String(value));
                }
                _ => tracing::debug!(pair, "skipping undecodable query pair"),
            }
        }

        Self { params }
    }

    /// Add or replace a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Get a raw value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    /// Check if a parameter exists (even if it holds null)
    pub fn has(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Get all parameter names
    pub fn keys(&self) -> Vec<&String> {
        self.params.keys().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RequestBag
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Where a field's value is looked up, in precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestSource {
    Body,
    Query,
    Files,
}

/// Request-shaped input with up to three optional sections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<RequestBag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<RequestBag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<RequestBag>,
}

impl FormRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, body: RequestBag) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: RequestBag) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_files(mut self, files: RequestBag) -> Self {
        self.files = Some(files);
        self
    }

    /// Build from a JSON document shaped `{"body": {..}, "query": {..}, "files": {..}}`
    pub fn from_json(json: JsonValue) -> serde_json::Result<Self> {
        serde_json::from_value(json)
    }

    /// Mutable access to the body section, creating it if absent
    pub fn body_mut(&mut self) -> &mut RequestBag {
        self.body.get_or_insert_with(RequestBag::default)
    }

    /// First section containing `identifier`: body, then query, then files
    pub fn lookup(&self, identifier: &str) -> Option<(RequestSource, &Value)> {
        [
            (RequestSource::Body, &self.body),
            (RequestSource::Query, &self.query),
            (RequestSource::Files, &self.files),
        ]
        .into_iter()
        .find_map(|(source, bag)| {
            bag.as_ref()
                .and_then(|bag| bag.get(identifier))
                .map(|value| (source, value))
        })
    }
}
