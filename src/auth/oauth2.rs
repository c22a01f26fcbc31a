//! OAuth2 client-credentials authentication.
//!
//! The hook obtains a token from the token endpoint on first use, caches it
//! and attaches it as a bearer credential. An expired token is renewed with
//! the `refresh_token` grant when the server issued one, otherwise (or if the
//! refresh is rejected) a new client-credentials token is requested.

use super::token::Token;
use crate::error::{RestError, Result};
use crate::hooks::{PreSendHook, SendContext};
use crate::problem::ProblemDetail;
use crate::request::HttpRequest;
use chrono::Utc;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use std::fmt;
use std::sync::Mutex;
use url::{form_urlencoded, Url};

pub struct OAuth2Auth {
    client_id: String,
    client_secret: String,
    token_url: Url,
    scope: Option<String>,
    token: Mutex<Option<Token>>,
}

impl OAuth2Auth {
    pub fn new(client_id: &str, client_secret: &str, token_url: &str, scope: Option<String>) -> Result<Self> {
        let token_url = Url::parse(token_url)
            .map_err(|e| RestError::Config(format!("invalid token_url: {}", e)))?;

        Ok(OAuth2Auth {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_url,
            scope,
            token: Mutex::new(None),
        })
    }

    /// Seed the cache, e.g. with a token persisted by the application
    pub fn with_token(self, token: Token) -> Self {
        if let Ok(mut cached) = self.token.lock() {
            *cached = Some(token);
        }
        self
    }

    fn client_credentials_form(&self) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("grant_type", "client_credentials")
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret);
        if let Some(ref scope) = self.scope {
            form.append_pair("scope", scope);
        }
        form.finish()
    }

    fn refresh_form(&self, refresh_token: &str) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("grant_type", "refresh_token")
            .append_pair("refresh_token", refresh_token)
            .append_pair("client_id", &self.client_id)
            .append_pair("client_secret", &self.client_secret)
            .finish()
    }

    /// POST a grant to the token endpoint
    fn request_token(&self, form: String, ctx: &SendContext<'_>) -> Result<Token> {
        let mut request = HttpRequest::new(Method::POST, self.token_url.clone());
        request.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("application/json"));
        request.body = Some(form.into_bytes());

        let response = ctx.transport.execute(&request)?;
        if !response.status.is_success() {
            let problem = ProblemDetail::from_response(&response);
            return Err(RestError::Auth(format!(
                "token endpoint returned {}: {}",
                response.status.as_u16(),
                problem.detail.filter(|d| !d.is_empty()).unwrap_or(problem.title)
            )));
        }

        let token: Token = serde_json::from_slice(&response.body)
            .map_err(|e| RestError::Auth(format!("invalid token response: {}", e)))?;
        tracing::debug!(token_url = %self.token_url, expires_in = ?token.expires_in, "obtained oauth2 token");
        Ok(token.issued_at(Utc::now()))
    }

    /// Cached token if still valid, otherwise a refreshed or new one
    fn current_token(&self, ctx: &SendContext<'_>) -> Result<Token> {
        let mut cached = self
            .token
            .lock()
            .map_err(|_| RestError::Auth("oauth2 token lock poisoned".to_string()))?;

        let now = Utc::now();
        if let Some(ref token) = *cached {
            if !token.is_expired(now) {
                return Ok(token.clone());
            }
        }

        let refreshed = match cached.as_ref().and_then(|t| t.refresh_token.clone()) {
            Some(refresh_token) if !refresh_token.is_empty() => {
                match self.request_token(self.refresh_form(&refresh_token), ctx) {
                    Ok(token) => Some(token),
                    Err(e) => {
                        tracing::warn!("oauth2 refresh failed, requesting new token: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        let token = match refreshed {
            Some(token) => token,
            None => self.request_token(self.client_credentials_form(), ctx)?,
        };

        *cached = Some(token.clone());
        Ok(token)
    }
}

impl PreSendHook for OAuth2Auth {
    fn before_send(&self, request: &mut HttpRequest, ctx: &SendContext<'_>) -> Result<()> {
        let token = self.current_token(ctx)?;
        let mut value = HeaderValue::from_str(&token.authorization())
            .map_err(|e| RestError::Auth(format!("invalid access token: {}", e)))?;
        value.set_sensitive(true);
        request.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

impl fmt::Debug for OAuth2Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Auth")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url.as_str())
            .field("scope", &self.scope)
            .finish()
    }
}
