//! Credential injection.
//!
//! [`ApiAuthenticator`] reads an [`AuthConfig`] once and registers a single
//! pre-send hook for the configured scheme, plus a post-send observer for
//! schemes that learn from responses (Digest nonce renewal). Incomplete
//! configuration registers nothing and requests go out unauthenticated.

mod basic;
mod digest;
mod oauth2;
mod token;

pub use basic::BasicAuth;
pub use digest::{DigestAlgorithm, DigestAuth, DigestChallenge};
pub use oauth2::OAuth2Auth;
pub use token::Token;

use crate::config::{AuthConfig, AuthType};
use crate::hooks::{HookId, PostSendHook, PreSendHook, AUTH_PRIORITY};
use crate::rest::RestClient;
use std::sync::Arc;

/// Hooks implementing one authentication scheme
pub struct AuthHooks {
    pub pre_send: Arc<dyn PreSendHook>,
    pub post_send: Option<Arc<dyn PostSendHook>>,
}

impl AuthHooks {
    fn pre_send_only(hook: Arc<dyn PreSendHook>) -> Self {
        AuthHooks {
            pre_send: hook,
            post_send: None,
        }
    }
}

/// Selects and attaches the authentication hook for a client
#[derive(Debug)]
pub struct ApiAuthenticator {
    config: AuthConfig,
    hooks: Vec<HookId>,
}

impl ApiAuthenticator {
    pub fn new(config: AuthConfig) -> Self {
        ApiAuthenticator {
            config,
            hooks: Vec::new(),
        }
    }

    /// Hooks implementing the configured scheme, if the configuration is
    /// complete
    pub fn strategy(config: &AuthConfig) -> Option<AuthHooks> {
        let (auth_type, username, password) = config.credentials()?;

        let hooks = match auth_type {
            AuthType::Basic => AuthHooks::pre_send_only(Arc::new(BasicAuth::new(username, password))),
            AuthType::Digest => {
                let digest = Arc::new(DigestAuth::new(username, password));
                let observer: Arc<dyn PostSendHook> = digest.clone();
                AuthHooks {
                    pre_send: digest,
                    post_send: Some(observer),
                }
            }
            AuthType::OAuth2 => {
                let token_url = match config.token_url.as_deref() {
                    Some(url) => url,
                    None => {
                        tracing::warn!("oauth2 authentication configured without token_url, skipping");
                        return None;
                    }
                };
                match OAuth2Auth::new(username, password, token_url, config.scope.clone()) {
                    Ok(auth) => AuthHooks::pre_send_only(Arc::new(auth)),
                    Err(e) => {
                        tracing::warn!("oauth2 authentication disabled: {}", e);
                        return None;
                    }
                }
            }
        };

        Some(hooks)
    }

    /// Register the authentication hook on `client`. Does nothing when
    /// already attached or when the configuration is incomplete.
    pub fn attach(&mut self, client: &mut RestClient) {
        if !self.hooks.is_empty() {
            return;
        }

        if let Some(hooks) = Self::strategy(&self.config) {
            self.hooks.push(client.on_pre_send(AUTH_PRIORITY, hooks.pre_send));
            if let Some(observer) = hooks.post_send {
                self.hooks.push(client.on_post_send(AUTH_PRIORITY, observer));
            }
            tracing::debug!(auth_type = ?self.config.auth_type, "attached authentication");
        }
    }

    /// Remove the hooks this authenticator registered. Hooks that were
    /// already removed are skipped.
    pub fn detach(&mut self, client: &mut RestClient) {
        for id in self.hooks.drain(..) {
            client.remove_hook(id);
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.hooks.is_empty()
    }

    pub fn hook_ids(&self) -> &[HookId] {
        &self.hooks
    }
}
