//! Event records
//!
//! An `EventRecord` is one observed request/response as delivered by the
//! upstream event source. The JSON shape follows the request telemetry
//! emitted by HTTP servers: camelCase fields, client details nested under
//! `source`, request sub-events under `log`.
//!
//! ```json
//! {
//!   "event": "response",
//!   "timestamp": 1736937045123,
//!   "method": "get",
//!   "path": "/search",
//!   "query": { "q": "rust", "tag": ["a", "b"] },
//!   "statusCode": 200,
//!   "source": { "remoteAddress": "10.0.0.1", "referer": null, "userAgent": "curl/8.5" },
//!   "responsePayload": "hello",
//!   "log": [{ "tags": ["received"], "data": { "url": "/search?q=rust&tag=a&tag=b" } }]
//! }
//! ```
//!
//! Records are read-only once built. Unknown fields are ignored, and a known
//! field of an unusable shape (a `statusCode` of `"abc"`, a `source` that is
//! not an object) reads as absent instead of rejecting the whole record.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, Local, TimeZone};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Event kind emitted for completed responses
pub const RESPONSE_KIND: &str = "response";

/// Sub-event tag marking the originally received request
pub const RECEIVED_TAG: &str = "received";

/// A single request/response telemetry record
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventRecord {
    /// Event kind (e.g. "response")
    #[serde(rename = "event", deserialize_with = "lenient_kind")]
    pub kind: String,

    /// When the request was received
    #[serde(deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<FixedOffset>>,

    /// HTTP method as reported upstream (any case)
    #[serde(deserialize_with = "lenient_string")]
    pub method: Option<String>,

    /// Request path without query string
    #[serde(deserialize_with = "lenient_string")]
    pub path: Option<String>,

    /// Parsed query parameters
    pub query: QueryParams,

    /// Final response status code
    #[serde(deserialize_with = "lenient_status")]
    pub status_code: Option<u16>,

    /// Client details
    pub source: RequestSource,

    /// Captured response payload, if any
    pub response_payload: Option<Payload>,

    /// Request sub-events in the order they were recorded
    #[serde(rename = "log", deserialize_with = "lenient_sub_events")]
    pub sub_events: Vec<SubEvent>,
}

impl EventRecord {
    /// Create an empty record of the given kind
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Create an empty "response" record
    pub fn response() -> Self {
        Self::new(RESPONSE_KIND)
    }

    /// Parse one JSON document, which must be an object
    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        if bytes.trim_ascii_start().first() != Some(&b'{') {
            return Err(serde_json::Error::custom("event record must be a JSON object"));
        }
        serde_json::from_slice(bytes)
    }

    #[must_use]
    pub fn with_remote_address(mut self, address: impl Into<String>) -> Self {
        self.source.remote_address = Some(address.into());
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<FixedOffset>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push(key, value);
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    #[must_use]
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.source.referer = Some(referer.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.source.user_agent = Some(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.response_payload = Some(payload);
        self
    }

    #[must_use]
    pub fn with_sub_event(mut self, sub_event: SubEvent) -> Self {
        self.sub_events.push(sub_event);
        self
    }

    /// URL of the first "received" sub-event that recorded one
    pub fn received_url(&self) -> Option<&str> {
        self.sub_events
            .iter()
            .filter(|e| e.has_tag(RECEIVED_TAG))
            .find_map(SubEvent::url)
    }

    /// Request target rebuilt from `path` and `query`
    ///
    /// The `?` is only added when there are query parameters.
    pub fn request_target(&self) -> Option<Cow<'_, str>> {
        let path = self.path.as_deref()?;
        if self.query.is_empty() {
            return Some(Cow::Borrowed(path));
        }
        Some(Cow::Owned(format!("{}?{}", path, self.query.encode())))
    }
}

/// Client details attached to a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSource {
    pub remote_address: Option<String>,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
}

impl<'de> Deserialize<'de> for RequestSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Value::Object(map) = Value::deserialize(deserializer)? else {
            return Ok(Self::default());
        };

        let field = |name: &str| map.get(name).and_then(Value::as_str).map(str::to_owned);
        Ok(Self {
            remote_address: field("remoteAddress"),
            referer: field("referer"),
            user_agent: field("userAgent"),
        })
    }
}

/// Query parameters in their original order
///
/// Arrays in the JSON form expand to repeated keys, so `{"a": ["1", "2"]}`
/// becomes `a=1&a=2`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as `application/x-www-form-urlencoded`
    pub fn encode(&self) -> String {
        serde_urlencoded::to_string(&self.0).unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Value::Object(map) = Value::deserialize(deserializer)? else {
            return Ok(Self::default());
        };

        let mut params = Self::new();
        for (key, value) in map {
            match value {
                Value::Array(items) => {
                    for item in items {
                        params.push(key.clone(), scalar_to_string(item));
                    }
                }
                other => params.push(key, scalar_to_string(other)),
            }
        }
        Ok(params)
    }
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A captured response payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Text body
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Structured value that was never serialized upstream
    Structured(Value),
}

impl Payload {
    /// Size in bytes
    ///
    /// Structured payloads are measured by their compact JSON encoding, which
    /// approximates but is not guaranteed to equal the bytes on the wire.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
            Self::Structured(value) => serde_json::to_vec(value).map_or(0, |v| v.len()),
        }
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Self::Text(text),
            other => Self::Structured(other),
        })
    }
}

/// A tagged sub-event recorded while the request was processed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubEvent {
    pub tags: Vec<String>,
    pub data: Option<Value>,
}

impl SubEvent {
    /// A "received" sub-event carrying the original request URL
    pub fn received(url: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("url".into(), Value::String(url.into()));
        Self {
            tags: vec![RECEIVED_TAG.into()],
            data: Some(Value::Object(data)),
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// URL recorded with this sub-event
    pub fn url(&self) -> Option<&str> {
        self.data.as_ref()?.get("url")?.as_str()
    }

    /// Read one `log` entry; anything but an object is skipped
    fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };

        let tags = match map.remove("tags") {
            Some(Value::Array(tags)) => tags
                .into_iter()
                .filter_map(|tag| match tag {
                    Value::String(tag) => Some(tag),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        let data = map.remove("data").filter(|data| !data.is_null());

        Some(Self { tags, data })
    }
}

fn lenient_kind<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

/// Accepts an integer, a whole float or a numeric string in the `u16` range
fn lenient_status<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64))
            .and_then(|code| u16::try_from(code).ok()),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Accepts epoch milliseconds, integer or float, rendered in the local zone,
/// or an RFC 3339 string
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<FixedOffset>>, D::Error>
where
    D: Deserializer<'de>,
{
    let millis = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(text) => return Ok(DateTime::parse_from_rfc3339(text.trim()).ok()),
        _ => None,
    };

    Ok(millis.and_then(|ms| {
        Local
            .timestamp_millis_opt(ms)
            .single()
            .map(|t| t.fixed_offset())
    }))
}

fn lenient_sub_events<'de, D>(deserializer: D) -> Result<Vec<SubEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().filter_map(SubEvent::from_value).collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
#[path = "record_test.rs"]
mod record_test;
