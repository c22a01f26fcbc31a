//! HTTP Digest authentication (RFC 7616).
//!
//! Before the first request, an unauthenticated `HEAD` to the target URL
//! collects the server's `WWW-Authenticate` challenge. The challenge is
//! reused afterwards with an incrementing nonce count. A `401` carrying a new challenge (for instance `stale=true` after
//! the server rotated its nonce) replaces the cached one for the next call;
//! a `401` without a Digest challenge drops it so the next call asks again.

use crate::error::{RestError, Result};
use crate::hooks::{PostSendHook, PreSendHook, SendContext};
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use md5::Md5;
use reqwest::header::{HeaderValue, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Method, StatusCode};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Md5,
    Md5Sess,
    Sha256,
    Sha256Sess,
}

impl DigestAlgorithm {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "MD5" => Some(DigestAlgorithm::Md5),
            "MD5-SESS" => Some(DigestAlgorithm::Md5Sess),
            "SHA-256" => Some(DigestAlgorithm::Sha256),
            "SHA-256-SESS" => Some(DigestAlgorithm::Sha256Sess),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Md5Sess => "MD5-sess",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha256Sess => "SHA-256-sess",
        }
    }

    fn is_session(self) -> bool {
        matches!(self, DigestAlgorithm::Md5Sess | DigestAlgorithm::Sha256Sess)
    }

    fn hash(self, data: &str) -> String {
        match self {
            DigestAlgorithm::Md5 | DigestAlgorithm::Md5Sess => {
                format!("{:x}", Md5::digest(data.as_bytes()))
            }
            DigestAlgorithm::Sha256 | DigestAlgorithm::Sha256Sess => {
                format!("{:x}", Sha256::digest(data.as_bytes()))
            }
        }
    }

    fn hash_bytes(self, data: &[u8]) -> String {
        match self {
            DigestAlgorithm::Md5 | DigestAlgorithm::Md5Sess => format!("{:x}", Md5::digest(data)),
            DigestAlgorithm::Sha256 | DigestAlgorithm::Sha256Sess => {
                format!("{:x}", Sha256::digest(data))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Qop {
    Auth,
    AuthInt,
}

/// Parameters of a `WWW-Authenticate: Digest ...` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: DigestAlgorithm,
    /// `qop` options offered by the server, lowercased
    pub qop: Vec<String>,
    pub stale: bool,
}

impl DigestChallenge {
    /// Parse a single header value. Returns `None` for other schemes,
    /// unsupported algorithms or a missing nonce.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, rest) = header.split_at(header.find(char::is_whitespace)?);
        if !scheme.eq_ignore_ascii_case("digest") {
            return None;
        }

        let mut challenge = DigestChallenge {
            realm: String::new(),
            nonce: String::new(),
            opaque: None,
            algorithm: DigestAlgorithm::Md5,
            qop: Vec::new(),
            stale: false,
        };

        for (key, value) in parse_params(rest) {
            match key.as_str() {
                "realm" => challenge.realm = value,
                "nonce" => challenge.nonce = value,
                "opaque" => challenge.opaque = Some(value),
                "algorithm" => challenge.algorithm = DigestAlgorithm::parse(&value)?,
                "qop" => {
                    challenge.qop = value
                        .split(',')
                        .map(|q| q.trim().to_ascii_lowercase())
                        .filter(|q| !q.is_empty())
                        .collect();
                }
                "stale" => challenge.stale = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        if challenge.nonce.is_empty() {
            return None;
        }
        Some(challenge)
    }

    /// `auth` is preferred over `auth-int`; `None` for legacy RFC 2069 servers
    fn select_qop(&self) -> Option<Qop> {
        if self.qop.iter().any(|q| q == "auth") {
            Some(Qop::Auth)
        } else if self.qop.iter().any(|q| q == "auth-int") {
            Some(Qop::AuthInt)
        } else {
            None
        }
    }
}

/// Split `key=value, key="quoted, value"` lists
fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }

        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        if key.is_empty() {
            break;
        }

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        if chars.peek() != Some(&'=') {
            out.push((key.to_ascii_lowercase(), String::new()));
            continue;
        }
        chars.next();
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }

        let mut value = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => break,
                    _ => value.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c == ',' {
                    break;
                }
                value.push(c);
                chars.next();
            }
            value = value.trim().to_string();
        }

        out.push((key.to_ascii_lowercase(), value));
    }

    out
}

/// First Digest challenge among the response's `WWW-Authenticate` values
fn offered_challenge(response: &HttpResponse) -> Option<DigestChallenge> {
    response
        .headers
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(DigestChallenge::parse)
}

struct DigestState {
    challenge: DigestChallenge,
    nonce_count: u32,
}

/// HTTP Digest authentication hook
pub struct DigestAuth {
    username: String,
    password: String,
    state: Mutex<Option<DigestState>>,
}

impl DigestAuth {
    pub fn new(username: &str, password: &str) -> Self {
        DigestAuth {
            username: username.to_string(),
            password: password.to_string(),
            state: Mutex::new(None),
        }
    }

    /// Seed the hook with a known challenge, skipping the HEAD request
    pub fn with_challenge(self, challenge: DigestChallenge) -> Self {
        if let Ok(mut state) = self.state.lock() {
            *state = Some(DigestState {
                challenge,
                nonce_count: 0,
            });
        }
        self
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, Option<DigestState>>> {
        self.state
            .lock()
            .map_err(|_| RestError::Auth("digest state lock poisoned".to_string()))
    }

    /// Ask the server for a challenge with an unauthenticated HEAD request
    fn request_challenge(&self, request: &HttpRequest, ctx: &SendContext<'_>) -> Result<Option<DigestChallenge>> {
        let head = HttpRequest::new(Method::HEAD, request.url.clone());
        let response = ctx.transport.execute(&head)?;

        if response.status != StatusCode::UNAUTHORIZED {
            tracing::warn!(
                status = response.status.as_u16(),
                url = %request.url,
                "digest HEAD request was not challenged"
            );
            return Ok(None);
        }

        let challenge = offered_challenge(&response);
        if challenge.is_none() {
            tracing::warn!(url = %request.url, "server did not offer a digest challenge");
        }
        Ok(challenge)
    }

    /// Build the `Authorization` value for `request` under `challenge`
    fn authorization(
        &self,
        request: &HttpRequest,
        challenge: &DigestChallenge,
        nonce_count: u32,
        cnonce: &str,
    ) -> String {
        let algorithm = challenge.algorithm;
        let uri = request.request_uri();
        let qop = challenge.select_qop();
        let nc = format!("{:08x}", nonce_count);

        let mut ha1 = algorithm.hash(&format!(
            "{}:{}:{}",
            self.username, challenge.realm, self.password
        ));
        if algorithm.is_session() {
            ha1 = algorithm.hash(&format!("{}:{}:{}", ha1, challenge.nonce, cnonce));
        }

        let ha2 = match qop {
            Some(Qop::AuthInt) => {
                let body_hash = algorithm.hash_bytes(request.body.as_deref().unwrap_or_default());
                algorithm.hash(&format!("{}:{}:{}", request.method, uri, body_hash))
            }
            _ => algorithm.hash(&format!("{}:{}", request.method, uri)),
        };

        let response = match qop {
            Some(q) => {
                let qop_str = if q == Qop::Auth { "auth" } else { "auth-int" };
                algorithm.hash(&format!(
                    "{}:{}:{}:{}:{}:{}",
                    ha1, challenge.nonce, nc, cnonce, qop_str, ha2
                ))
            }
            None => algorithm.hash(&format!("{}:{}:{}", ha1, challenge.nonce, ha2)),
        };

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
            self.username,
            challenge.realm,
            challenge.nonce,
            uri,
            algorithm.as_str(),
            response
        );
        if let Some(q) = qop {
            let qop_str = if q == Qop::Auth { "auth" } else { "auth-int" };
            header.push_str(&format!(", qop={}, nc={}, cnonce=\"{}\"", qop_str, nc, cnonce));
        }
        if let Some(ref opaque) = challenge.opaque {
            header.push_str(&format!(", opaque=\"{}\"", opaque));
        }
        header
    }
}

impl PreSendHook for DigestAuth {
    fn before_send(&self, request: &mut HttpRequest, ctx: &SendContext<'_>) -> Result<()> {
        if self.lock_state()?.is_none() {
            match self.request_challenge(request, ctx)? {
                Some(challenge) => {
                    *self.lock_state()? = Some(DigestState {
                        challenge,
                        nonce_count: 0,
                    });
                }
                None => return Ok(()),
            }
        }

        let (challenge, nonce_count) = {
            let mut guard = self.lock_state()?;
            match guard.as_mut() {
                Some(state) => {
                    state.nonce_count += 1;
                    (state.challenge.clone(), state.nonce_count)
                }
                None => return Ok(()),
            }
        };

        let cnonce = Uuid::new_v4().simple().to_string();
        let header = self.authorization(request, &challenge, nonce_count, &cnonce);
        let mut value = HeaderValue::from_str(&header)
            .map_err(|e| RestError::Auth(format!("invalid digest header: {}", e)))?;
        value.set_sensitive(true);
        request.headers.insert(AUTHORIZATION, value);
        Ok(())
    }
}

impl PostSendHook for DigestAuth {
    fn after_send(&self, request: &HttpRequest, response: &HttpResponse) {
        if response.status != StatusCode::UNAUTHORIZED {
            return;
        }

        let mut state = match self.lock_state() {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("{}", e);
                return;
            }
        };

        match offered_challenge(response) {
            Some(challenge) => {
                tracing::debug!(url = %request.url, stale = challenge.stale, "digest challenge renewed");
                *state = Some(DigestState {
                    challenge,
                    nonce_count: 0,
                });
            }
            None => {
                tracing::debug!(url = %request.url, "digest credentials rejected, challenge dropped");
                *state = None;
            }
        }
    }
}

impl fmt::Debug for DigestAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
