//! End-to-end tests running the real reqwest transport against a local
//! httpmock server.

use httpmock::prelude::*;
use httpmock::Method::HEAD;
use restgate::{
    params, AuthConfig, Body, ClientConfig, Params, RestClient, RestError, RestGateway,
};
use serde::Deserialize;
use serde_json::json;

fn client(server: &MockServer) -> RestClient {
    RestClient::from_config(ClientConfig::new(server.base_url())).expect("failed to build client")
}

fn client_with_auth(server: &MockServer, auth: AuthConfig) -> RestClient {
    let config = ClientConfig::new(server.base_url()).with_authentication(auth);
    RestClient::from_config(config).expect("failed to build client")
}

#[test]
fn test_get_json() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/users/7")
            .query_param("expand", "roles")
            .header("accept", "application/json");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"id":7,"name":"Ada","roles":["admin"]}"#);
    });

    let response = client(&server)
        .get("users/7", params([("expand", "roles")]))
        .expect("GET failed");

    #[derive(Debug, Deserialize)]
    struct User {
        id: u32,
        name: String,
        roles: Vec<String>,
    }

    let user: User = response.json().expect("failed to decode user");
    assert_eq!(user.id, 7);
    assert_eq!(user.name, "Ada");
    assert_eq!(user.roles, vec!["admin".to_string()]);
    mock.assert();
}

#[test]
fn test_non_json_body_is_raw() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(200).header("content-type", "text/plain").body("OK");
    });

    let response = client(&server).get("health", Params::new()).expect("GET failed");
    assert_eq!(response.body, Body::Raw(b"OK".to_vec()));
}

#[test]
fn test_create_returns_id_from_location() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/users")
            .header("content-type", "application/json")
            .json_body(json!({"name": "Grace"}));
        then.status(201).header("location", "/users/42");
    });

    let client = client(&server);
    let users = RestGateway::new("users", &client);
    let id = users.create(json!({"name": "Grace"})).expect("create failed");

    assert_eq!(id, "42");
    mock.assert();
}

#[test]
fn test_created_without_location_is_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/users");
        then.status(201);
    });

    let error = client(&server)
        .post("users", Params::new(), json!({}))
        .expect_err("expected missing Location to fail");

    match error {
        RestError::Response(problem) => {
            assert_eq!(problem.status, 500);
            assert!(problem.problem.title.contains("Location"));
        }
        other => panic!("expected RestError::Response, got {:?}", other),
    }
}

#[test]
fn test_problem_details_error() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/users/9");
        then.status(404)
            .header("content-type", "application/problem+json")
            .body(
                r#"{"type":"https://example.com/probs/missing","title":"User not found","detail":"No user 9","trace_id":"abc"}"#,
            );
    });

    let client = client(&server);
    let error = RestGateway::new("users", &client)
        .fetch("9")
        .expect_err("expected 404 to fail");

    assert!(error.is_not_found());
    assert_eq!(error.status_code(), Some(404));
    let problem = error.problem().expect("expected problem details");
    assert_eq!(problem.status, 404);
    assert_eq!(problem.problem.title, "User not found");
    assert_eq!(problem.problem.detail.as_deref(), Some("No user 9"));
    assert_eq!(error.additional_detail("trace_id"), Some(&json!("abc")));
}

#[test]
fn test_server_error_without_problem_body() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(DELETE).path("/users/3");
        then.status(503).header("content-type", "text/html").body("<h1>down</h1>");
    });

    let error = client(&server)
        .delete("users/3", Params::new())
        .expect_err("expected 503 to fail");

    match error {
        RestError::Server(problem) => {
            assert_eq!(problem.status, 503);
            assert_eq!(problem.problem.title, "Service Unavailable");
            assert_eq!(problem.problem.detail.as_deref(), Some("<h1>down</h1>"));
        }
        other => panic!("expected RestError::Server, got {:?}", other),
    }
}

#[test]
fn test_basic_auth_header() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/me")
            .header("authorization", "Basic dXNlcjpwYXNz");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"user":"user"}"#);
    });

    let client = client_with_auth(&server, AuthConfig::basic("user", "pass"));
    let response = client.get("me", Params::new()).expect("GET failed");

    assert_eq!(response.get_string("user").as_deref(), Some("user"));
    mock.assert();
}

#[test]
fn test_digest_auth_challenge_then_authenticates() {
    let server = MockServer::start();
    let challenge = server.mock(|when, then| {
        when.method(HEAD).path("/secure");
        then.status(401).header(
            "www-authenticate",
            r#"Digest realm="api", qop="auth", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        );
    });
    let api = server.mock(|when, then| {
        when.method(GET).path("/secure").header_exists("authorization");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"ok":true}"#);
    });

    let client = client_with_auth(&server, AuthConfig::digest("Mufasa", "Circle Of Life"));
    client.get("secure", Params::new()).expect("first GET failed");
    client.get("secure", Params::new()).expect("second GET failed");

    // The challenge is cached after the first HEAD request
    challenge.assert_calls(1);
    api.assert_calls(2);
}

#[test]
fn test_oauth2_client_credentials() {
    let server = MockServer::start();
    let token = server.mock(|when, then| {
        when.method(POST)
            .path("/oauth/token")
            .header("content-type", "application/x-www-form-urlencoded");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"access_token":"tok-1","token_type":"Bearer","expires_in":3600}"#);
    });
    let api = server.mock(|when, then| {
        when.method(GET)
            .path("/orders")
            .header("authorization", "Bearer tok-1");
        then.status(200)
            .header("content-type", "application/json")
            .body("[]");
    });

    let auth = AuthConfig::oauth2("client", "secret", server.url("/oauth/token"));
    let client = client_with_auth(&server, auth);
    let orders = RestGateway::new("orders", &client);

    assert!(orders.fetch_all(Params::new()).expect("first fetch failed").is_empty());
    assert!(orders.fetch_all(Params::new()).expect("second fetch failed").is_empty());

    token.assert_calls(1);
    api.assert_calls(2);
}

#[test]
fn test_fetch_all_hal_with_query() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/users").query_param("page", "2");
        then.status(200)
            .header("content-type", "application/hal+json")
            .body(
                r#"{
                    "_links": {"self": {"href": "/users?page=2"}, "next": {"href": "/users?page=3"}},
                    "_embedded": {"users": [{"id": 3}, {"id": 4}]},
                    "page": 2,
                    "page_count": 3,
                    "total_items": 6
                }"#,
            );
    });

    let client = client(&server);
    let users = RestGateway::new("users", &client)
        .fetch_all(params([("page", "2")]))
        .expect("fetch_all failed");

    assert_eq!(users.len(), 2);
    assert_eq!(users.first().map(|u| u["id"].clone()), Some(json!(3)));
    assert!(users.has_next());
    assert_eq!(users.pagination().and_then(|p| p.total_items), Some(6));
    mock.assert();
}

#[test]
fn test_update_patches_entity() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(PATCH)
            .path("/users/5")
            .json_body(json!({"name": "Linus"}));
        then.status(204);
    });

    let client = client(&server);
    let response = RestGateway::new("users", &client)
        .update("5", json!({"name": "Linus"}), Params::new())
        .expect("update failed");

    assert_eq!(response.status.as_u16(), 204);
    mock.assert();
}
