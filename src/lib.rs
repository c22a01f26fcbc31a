//! # restgate - REST resource client
//!
//! A blocking client for resource-oriented HTTP APIs. Requests go through a
//! single dispatch pipeline: build, pre-send hooks (authentication lives
//! here), transmit, post-send hooks, then status classification and JSON
//! decoding. On top of it, [`RestGateway`] maps create/fetch/update onto one
//! resource collection.
//!
//! ## Features
//!
//! - JSON request bodies and content negotiation (`application/json` and
//!   `application/*+json`)
//! - Errors classified by status (403, 404, other 4xx, 5xx) carrying the
//!   server's Problem Details (RFC 9457), or a synthesized equivalent
//! - Authentication via HTTP Basic, HTTP Digest or OAuth2 client credentials
//! - Ordered pre-send/post-send hooks scoped to a client instance
//! - HAL collections with pagination links
//!
//! ## Basic Usage
//!
//! ```no_run
//! use restgate::{AuthConfig, ClientConfig, RestClient, RestGateway};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("https://api.example.com/v1")
//!         .with_authentication(AuthConfig::basic("user", "secret"));
//!     let client = RestClient::from_config(config)?;
//!
//!     let users = RestGateway::new("users", &client);
//!     let id = users.create(serde_json::json!({"name": "Ada"}))?;
//!
//!     if let Some(found) = users.fetch(&id)? {
//!         let user: Vec<User> = found.deserialize()?;
//!         println!("User: {} ({})", user[0].name, user[0].id);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use restgate::{ClientConfig, RestClient, RestError, Params};
//!
//! let client = RestClient::from_config(ClientConfig::new("https://api.example.com"))?;
//!
//! match client.get("orders/7", Params::new()) {
//!     Ok(response) => println!("{:?}", response.body),
//!     Err(RestError::Resource(problem)) => println!("gone: {}", problem.problem.title),
//!     Err(e) => return Err(e),
//! }
//! # Ok::<(), restgate::RestError>(())
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod hooks;
pub mod problem;
pub mod request;
pub mod response;
pub mod rest;
pub mod result_set;
pub mod transport;

// Re-export main types for convenience
pub use auth::ApiAuthenticator;
pub use config::{AuthConfig, AuthType, ClientConfig, TransportConfig};
pub use error::{ApiProblem, RestError, Result};
pub use gateway::RestGateway;
pub use hooks::{HookId, PostSendHook, PreSendHook, SendContext};
pub use problem::ProblemDetail;
pub use request::{params, HttpRequest, Params, RequestSpec};
pub use response::{Body, HttpResponse, RestResponse};
pub use rest::RestClient;
pub use result_set::{Links, Pagination, ResultSet};
pub use transport::{ReqwestTransport, Transport};

// Re-export for convenience
pub use reqwest::Method;
pub use serde_json::json;
