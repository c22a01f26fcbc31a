use crate::problem::ProblemDetail;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// HTTP status code paired with the problem detail the server sent (or that
/// was synthesized for it).
#[derive(Debug, Clone, PartialEq)]
pub struct ApiProblem {
    pub status: u16,
    pub problem: ProblemDetail,
}

impl ApiProblem {
    pub fn new(status: u16, problem: ProblemDetail) -> Self {
        ApiProblem { status, problem }
    }

    /// Problem carrying only a message, used for errors raised locally rather
    /// than read from a response body.
    pub fn message(status: u16, title: impl Into<String>) -> Self {
        ApiProblem {
            status,
            problem: ProblemDetail::titled(title),
        }
    }
}

impl fmt::Display for ApiProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.problem.title)?;
        if let Some(ref detail) = self.problem.detail {
            if !detail.is_empty() {
                write!(f, ": {}", detail)?;
            }
        }
        Ok(())
    }
}

/// Main error type for REST operations
#[derive(Debug, Error)]
pub enum RestError {
    /// 403 Forbidden
    #[error("access denied: {0}")]
    Access(ApiProblem),

    /// 404 Not Found
    #[error("resource not found: {0}")]
    Resource(ApiProblem),

    /// Any other 4xx status
    #[error("client error: {0}")]
    Client(ApiProblem),

    /// 5xx status
    #[error("server error: {0}")]
    Server(ApiProblem),

    /// A non-error status whose response does not satisfy the contract of the
    /// call (missing `Location`, unexpected status, unusable body)
    #[error("invalid response: {0}")]
    Response(ApiProblem),

    /// Invalid caller input, rejected before any request is made
    #[error("invalid argument: {0}")]
    Argument(String),

    /// Operation that has no implementation
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Invalid client configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Credential acquisition failed
    #[error("authentication error: {0}")]
    Auth(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl RestError {
    /// Classify an error status. Returns `None` for statuses below 400.
    pub fn from_status(status: u16, problem: ProblemDetail) -> Option<Self> {
        let api = ApiProblem::new(status, problem);
        match status {
            403 => Some(RestError::Access(api)),
            404 => Some(RestError::Resource(api)),
            400..=499 => Some(RestError::Client(api)),
            500..=599 => Some(RestError::Server(api)),
            _ => None,
        }
    }

    /// Structured problem attached to HTTP-derived errors
    pub fn problem(&self) -> Option<&ApiProblem> {
        match self {
            RestError::Access(p)
            | RestError::Resource(p)
            | RestError::Client(p)
            | RestError::Server(p)
            | RestError::Response(p) => Some(p),
            _ => None,
        }
    }

    /// HTTP status code, for errors derived from a response
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RestError::Reqwest(e) => e.status().map(|s| s.as_u16()),
            other => other.problem().map(|p| p.status),
        }
    }

    /// Look up an extension member of the problem body by key
    pub fn additional_detail(&self, key: &str) -> Option<&Value> {
        self.problem().and_then(|p| p.problem.additional_detail(key))
    }

    /// Check if this error is a permission denied error (403)
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, RestError::Access(_))
    }

    /// Check if this error is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, RestError::Resource(_))
    }
}

/// Result type for REST operations
pub type Result<T> = std::result::Result<T, RestError>;
