use crate::error::{RestError, Result};
use crate::hooks::{PreSendHook, SendContext};
use crate::request::HttpRequest;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use std::fmt;

/// HTTP Basic authentication (RFC 7617)
pub struct BasicAuth {
    username: String,
    header: String,
}

impl BasicAuth {
    pub fn new(username: &str, password: &str) -> Self {
        let encoded = STANDARD.encode(format!("{}:{}", username, password));
        BasicAuth {
            username: username.to_string(),
            header: format!("Basic {}", encoded),
        }
    }
}

impl PreSendHook for BasicAuth {
    fn before_send(&self, request: &mut HttpRequest, _ctx: &SendContext<'_>) -> Result<()> {
        let mut value = HeaderValue::from_str(&self.header)
            .map_err(|e| RestError::Auth(format!("invalid basic credentials: {}", e)))?;
        value.set_sensitive(true);
        request.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("header", &"<redacted>")
            .finish()
    }
}
