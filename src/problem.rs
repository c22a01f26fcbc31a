//! Problem Details (RFC 9457) as reported by the remote API.
//!
//! Servers that speak the format answer errors with an
//! `application/problem+json` body. For everything else a problem is
//! synthesized from the reason phrase and the raw body, so callers always see
//! the same shape.

use crate::response::HttpResponse;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Structured error body.
///
/// `title` is always populated: when the server omits it, the HTTP reason
/// phrase is used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetail {
    /// URI reference identifying the problem type
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub problem_type: Option<String>,

    /// Short human-readable summary
    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// URI reference identifying this occurrence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Extension members (anything not listed above)
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl ProblemDetail {
    pub fn titled(title: impl Into<String>) -> Self {
        ProblemDetail {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Extract the problem from an error response.
    pub fn from_response(response: &HttpResponse) -> Self {
        if response.is_problem() {
            match serde_json::from_slice::<ProblemDetail>(&response.body) {
                Ok(mut problem) => {
                    if problem.title.is_empty() {
                        problem.title = response.reason_phrase().to_string();
                    }
                    return problem;
                }
                Err(e) => {
                    tracing::debug!("unparseable problem body, synthesizing: {}", e);
                }
            }
        }

        ProblemDetail::titled(response.reason_phrase()).with_detail(response.text())
    }

    /// Get an extension member by name
    pub fn additional_detail(&self, key: &str) -> Option<&Value> {
        self.additional.get(key)
    }
}
