use crate::error::Result;
use mime::Mime;
use reqwest::header::{HeaderMap, CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;
use serde_json::Value;

/// Content type for Problem Details bodies.
pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Content type for HAL hypermedia documents.
pub const APPLICATION_HAL_JSON: &str = "application/hal+json";

/// Raw response as returned by the transport.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// Header names are case-insensitive
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        HttpResponse {
            status,
            headers,
            body,
        }
    }

    /// Canonical reason phrase for the status code
    pub fn reason_phrase(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("Unknown Status")
    }

    /// Get a header value as a string, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// Parsed `Content-Type`, ignoring values that are not valid media types
    pub fn content_type(&self) -> Option<Mime> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<Mime>().ok())
    }

    /// `application/json` or any `application/*+json` type
    pub fn is_json(&self) -> bool {
        self.content_type().map_or(false, |m| is_json_mime(&m))
    }

    /// Exactly `application/problem+json` (parameters ignored)
    pub fn is_problem(&self) -> bool {
        self.has_essence(APPLICATION_PROBLEM_JSON)
    }

    pub fn is_hal(&self) -> bool {
        self.has_essence(APPLICATION_HAL_JSON)
    }

    fn has_essence(&self, essence: &str) -> bool {
        self.content_type()
            .map_or(false, |m| m.essence_str().eq_ignore_ascii_case(essence))
    }

    /// Body as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub(crate) fn is_json_mime(m: &Mime) -> bool {
    m.type_() == mime::APPLICATION
        && (m.subtype() == mime::JSON || m.suffix() == Some(mime::JSON))
}

/// Response payload after content negotiation
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Decoded JSON document
    Json(Value),
    /// Body of a non-JSON response, unmodified
    Raw(Vec<u8>),
}

impl Body {
    /// True for `null`, `[]`, `""` and an empty raw body
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Json(Value::Null) => true,
            Body::Json(Value::Array(items)) => items.is_empty(),
            Body::Json(Value::String(s)) => s.is_empty(),
            Body::Json(_) => false,
            Body::Raw(bytes) => bytes.is_empty(),
        }
    }

    /// True when the payload carries no entity: everything [`is_empty`]
    /// accepts plus `false`, zero and the string `"0"` (JSON or raw)
    ///
    /// [`is_empty`]: Body::is_empty
    pub fn is_falsy(&self) -> bool {
        match self {
            Body::Json(Value::Bool(b)) => !b,
            Body::Json(Value::Number(n)) => n.as_f64() == Some(0.0),
            Body::Json(Value::String(s)) => s.is_empty() || s == "0",
            Body::Raw(bytes) => bytes.is_empty() || bytes.as_slice() == b"0",
            other => other.is_empty(),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Raw(_) => None,
        }
    }
}

/// Result of a successful dispatch.
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl RestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<Mime> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<Mime>().ok())
    }

    pub fn is_hal(&self) -> bool {
        self.content_type()
            .map_or(false, |m| m.essence_str().eq_ignore_ascii_case(APPLICATION_HAL_JSON))
    }

    /// Deserialize the JSON body into the target type. A raw body is
    /// interpreted as a JSON string.
    pub fn json<T>(&self) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        match &self.body {
            Body::Json(value) => serde_json::from_value(value.clone()).map_err(|e| e.into()),
            Body::Raw(bytes) => {
                let text = String::from_utf8_lossy(bytes).into_owned();
                serde_json::from_value(Value::String(text)).map_err(|e| e.into())
            }
        }
    }

    /// Get a value from the JSON body by a slash-separated path.
    /// For example, "user/name" would access the "name" field inside the "user" object.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = self.body.as_json()?;

        for part in path.split('/').filter(|s| !s.is_empty()) {
            current = match current {
                Value::Object(map) => map.get(part)?,
                Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    arr.get(index)?
                }
                _ => return None,
            };
        }

        Some(current)
    }

    /// Get a string value from the JSON body by a slash-separated path
    pub fn get_string(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|v| v.as_str().map(|s| s.to_string()))
    }
}
