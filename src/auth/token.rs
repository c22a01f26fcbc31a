use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds before the reported expiry at which a token is treated as expired
const EXPIRY_MARGIN_SECS: i64 = 30;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Token represents an OAuth2 token with refresh capabilities.
/// It contains both access and refresh tokens for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Access token for API requests
    pub access_token: String,

    /// Refresh token for renewing expired access tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Token lifetime in seconds, as reported by the token endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// Moment the token stops being usable (not serialized)
    #[serde(skip)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Create a new Token
    pub fn new(access_token: String, refresh_token: Option<String>, expires_in: Option<i64>) -> Self {
        Token {
            access_token,
            refresh_token,
            token_type: default_token_type(),
            expires_in,
            expires_at: None,
        }
    }

    /// Fix the expiry relative to `issued_at`. Tokens without `expires_in`
    /// never expire. A lifetime beyond the representable range never expires
    /// either, while one too far in the past is expired at issue.
    pub fn issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.expires_at = self.expires_in.and_then(|secs| {
            let lifetime = secs.saturating_sub(EXPIRY_MARGIN_SECS);
            match Duration::try_seconds(lifetime).and_then(|d| issued_at.checked_add_signed(d)) {
                Some(at) => Some(at),
                None if lifetime > 0 => None,
                None => Some(issued_at),
            }
        });
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }

    /// Check if we have a refresh token available
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().map_or(false, |t| !t.is_empty())
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        // RFC 6750 uses "Bearer", some servers answer "bearer"
        if self.token_type.eq_ignore_ascii_case("bearer") {
            format!("Bearer {}", self.access_token)
        } else {
            format!("{} {}", self.token_type, self.access_token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("access123".to_string(), Some("refresh456".to_string()), Some(3600));

        assert_eq!(token.access_token, "access123");
        assert_eq!(token.token_type, "Bearer");
        assert!(token.has_refresh_token());
        assert_eq!(token.authorization(), "Bearer access123");
    }

    #[test]
    fn test_token_deserialization() {
        let json = r#"{"access_token":"abc","token_type":"bearer","expires_in":60}"#;
        let token: Token = serde_json::from_str(json).unwrap();

        assert_eq!(token.access_token, "abc");
        assert!(!token.has_refresh_token());
        assert_eq!(token.authorization(), "Bearer abc");
    }

    #[test]
    fn test_token_expiry() {
        let now = Utc::now();
        let token = Token::new("a".to_string(), None, Some(3600)).issued_at(now);
        assert!(!token.is_expired(now));
        assert!(token.is_expired(now + Duration::seconds(3600 - EXPIRY_MARGIN_SECS)));

        let forever = Token::new("a".to_string(), None, None).issued_at(now);
        assert!(!forever.is_expired(now + Duration::days(365)));
    }

    #[test]
    fn test_out_of_range_lifetimes() {
        let now = Utc::now();

        let huge = Token::new("a".to_string(), None, Some(i64::MAX)).issued_at(now);
        assert!(huge.expires_at.is_none());
        assert!(!huge.is_expired(now + Duration::days(365 * 100)));

        let negative = Token::new("a".to_string(), None, Some(i64::MIN)).issued_at(now);
        assert!(negative.is_expired(now));

        let short = Token::new("a".to_string(), None, Some(10)).issued_at(now);
        assert!(short.is_expired(now));
    }
}
