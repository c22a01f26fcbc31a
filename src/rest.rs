use crate::auth::ApiAuthenticator;
use crate::config::ClientConfig;
use crate::error::{ApiProblem, RestError, Result};
use crate::hooks::{HookId, HookRegistry, PostSendHook, PreSendHook, SendContext};
use crate::problem::ProblemDetail;
use crate::request::{HttpRequest, Params, RequestSpec};
use crate::response::{Body, HttpResponse, RestResponse};
use crate::transport::{ReqwestTransport, Transport};
use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// REST request dispatcher.
///
/// Turns a verb, a path relative to the configured base URL, query
/// parameters and an optional JSON payload into a [`RestResponse`] or a
/// typed [`RestError`]. Dispatch only needs `&self`: every call carries its
/// own request and response values, so one client can serve many call sites.
pub struct RestClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    hooks: HookRegistry,
    authenticator: Option<ApiAuthenticator>,
}

impl RestClient {
    /// Create a client over an existing transport, without authentication
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        RestClient {
            config,
            transport,
            hooks: HookRegistry::default(),
            authenticator: None,
        }
    }

    /// Validate `config`, build the reqwest transport from its
    /// `http_client` options and attach the configured authentication
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(&config.http_client)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Like [`from_config`](Self::from_config), over a caller-supplied transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let auth = config.authentication.clone();
        let mut client = RestClient::new(config, transport);

        if let Some(auth) = auth {
            let mut authenticator = ApiAuthenticator::new(auth);
            authenticator.attach(&mut client);
            client.authenticator = Some(authenticator);
        }

        Ok(client)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Remove the hooks registered by the configured authentication.
    /// Calling it again does nothing.
    pub fn detach_authentication(&mut self) {
        if let Some(mut authenticator) = self.authenticator.take() {
            authenticator.detach(self);
        }
    }

    /// Register a hook run before every request, highest priority first
    pub fn on_pre_send(&mut self, priority: i32, hook: Arc<dyn PreSendHook>) -> HookId {
        let id = self.hooks.add_pre_send(priority, hook);
        tracing::debug!(?id, priority, "registered pre-send hook");
        id
    }

    pub fn on_pre_send_fn<F>(&mut self, priority: i32, hook: F) -> HookId
    where
        F: Fn(&mut HttpRequest, &SendContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.on_pre_send(priority, Arc::new(hook))
    }

    /// Register a hook run after every response, highest priority first
    pub fn on_post_send(&mut self, priority: i32, hook: Arc<dyn PostSendHook>) -> HookId {
        let id = self.hooks.add_post_send(priority, hook);
        tracing::debug!(?id, priority, "registered post-send hook");
        id
    }

    pub fn on_post_send_fn<F>(&mut self, priority: i32, hook: F) -> HookId
    where
        F: Fn(&HttpRequest, &HttpResponse) + Send + Sync + 'static,
    {
        self.on_post_send(priority, Arc::new(hook))
    }

    /// Remove a hook. Returns false if it was not registered (anymore).
    pub fn remove_hook(&mut self, id: HookId) -> bool {
        let removed = self.hooks.remove(id);
        tracing::debug!(?id, removed, "remove hook");
        removed
    }

    pub fn has_hook(&self, id: HookId) -> bool {
        self.hooks.contains(id)
    }

    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Send GET request
    pub fn get(&self, path: &str, params: Params) -> Result<RestResponse> {
        self.send(Method::GET, path, params, None)
    }

    /// Send POST request with a JSON payload
    pub fn post(&self, path: &str, params: Params, data: Value) -> Result<RestResponse> {
        self.send(Method::POST, path, params, Some(data))
    }

    /// Send PUT request with a JSON payload
    pub fn put(&self, path: &str, params: Params, data: Value) -> Result<RestResponse> {
        self.send(Method::PUT, path, params, Some(data))
    }

    /// Send PATCH request with a JSON payload
    pub fn patch(&self, path: &str, params: Params, data: Value) -> Result<RestResponse> {
        self.send(Method::PATCH, path, params, Some(data))
    }

    /// Send DELETE request
    pub fn delete(&self, path: &str, params: Params) -> Result<RestResponse> {
        self.send(Method::DELETE, path, params, None)
    }

    /// Send an API request
    pub fn send(
        &self,
        method: Method,
        path: &str,
        params: Params,
        data: Option<Value>,
    ) -> Result<RestResponse> {
        let mut spec = RequestSpec::new(method, path).with_params(params);
        spec.data = data;
        self.dispatch(&spec)
    }

    /// Run the full pipeline for one request: build, pre-send hooks,
    /// transmit, post-send hooks, classify, decode.
    pub fn dispatch(&self, spec: &RequestSpec) -> Result<RestResponse> {
        let mut request = HttpRequest::from_spec(&self.config.base_url, spec)?;

        let ctx = SendContext {
            spec,
            transport: self.transport.as_ref(),
        };
        self.hooks.run_pre_send(&mut request, &ctx)?;

        request.set_header(ACCEPT.as_str(), &self.config.accept)?;

        let start = Instant::now();
        let response = self.transport.execute(&request)?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = response.status.as_u16(),
            elapsed = ?start.elapsed(),
            "rest request"
        );

        self.hooks.run_post_send(&request, &response);

        classify(response)
    }
}

/// Map the status to the error taxonomy, enforce `Location` on 201 and
/// decode JSON bodies.
fn classify(response: HttpResponse) -> Result<RestResponse> {
    let status = response.status;

    if status.is_client_error() || status.is_server_error() {
        let problem = ProblemDetail::from_response(&response);
        if let Some(error) = RestError::from_status(status.as_u16(), problem) {
            return Err(error);
        }
    }

    if status == StatusCode::CREATED && response.location().is_none() {
        return Err(RestError::Response(ApiProblem::message(
            500,
            "Response from server missing \"Location\" header",
        )));
    }

    let body = if response.is_json() {
        if response.body.iter().all(|b| b.is_ascii_whitespace()) {
            Body::Json(Value::Null)
        } else {
            Body::Json(serde_json::from_slice(&response.body)?)
        }
    } else {
        Body::Raw(response.body)
    };

    Ok(RestResponse {
        status,
        headers: response.headers,
        body,
    })
}
