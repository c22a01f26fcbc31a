//! Network boundary.
//!
//! The dispatcher never touches the network itself: it hands a fully-formed
//! [`HttpRequest`] to a [`Transport`] and gets an [`HttpResponse`] back. The
//! default implementation is a blocking reqwest client; tests substitute an
//! in-memory one.

use crate::config::TransportConfig;
use crate::error::Result;
use crate::request::HttpRequest;
use crate::response::HttpResponse;
use reqwest::blocking::{Client, ClientBuilder};
use std::time::Duration;

/// Performs one blocking HTTP exchange.
///
/// Timeouts, TLS and connection reuse are the transport's concern.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Create the HTTP client for REST API requests from the transport options
pub fn create_rest_client(config: &TransportConfig) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout());

    builder = if config.keepalive {
        builder
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .tcp_keepalive(Duration::from_secs(60))
    } else {
        builder.pool_max_idle_per_host(0)
    };

    if let Some(ref user_agent) = config.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }

    Ok(builder.build()?)
}

/// [`Transport`] backed by `reqwest::blocking`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        Ok(ReqwestTransport {
            client: create_rest_client(config)?,
        })
    }

    /// Wrap an already configured client
    pub fn with_client(client: Client) -> Self {
        ReqwestTransport { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());

        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let http_response = builder.send()?;
        let status = http_response.status();
        let headers = http_response.headers().clone();
        let body = http_response.bytes()?;

        Ok(HttpResponse::new(status, headers, body.to_vec()))
    }
}
