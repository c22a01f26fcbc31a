use crate::error::{ApiProblem, RestError, Result};
use crate::request::Params;
use crate::response::{Body, RestResponse};
use crate::result_set::ResultSet;
use crate::rest::RestClient;
use reqwest::StatusCode;
use serde_json::Value;

/// CRUD operations on one resource collection.
///
/// The gateway borrows its [`RestClient`]; any number of gateways can share
/// one client.
#[derive(Clone)]
pub struct RestGateway<'a> {
    resource_slug: String,
    client: &'a RestClient,
    collection_key: String,
}

impl<'a> RestGateway<'a> {
    /// Create a gateway for `resource_slug` (e.g. `"users"`), relative to
    /// the client's base URL
    pub fn new(resource_slug: impl Into<String>, client: &'a RestClient) -> Self {
        let resource_slug = resource_slug.into();
        let collection_key = resource_slug
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();

        RestGateway {
            resource_slug,
            client,
            collection_key,
        }
    }

    /// Key of the entity list inside a HAL `_embedded` object. Defaults to
    /// the last segment of the resource slug.
    pub fn with_collection_key(mut self, key: impl Into<String>) -> Self {
        self.collection_key = key.into();
        self
    }

    pub fn resource_slug(&self) -> &str {
        &self.resource_slug
    }

    pub fn collection_key(&self) -> &str {
        &self.collection_key
    }

    pub fn client(&self) -> &'a RestClient {
        self.client
    }

    /// Path of one entity. The id always stays a single path segment:
    /// reserved characters are percent-encoded and dot segments rejected.
    fn entity_path(&self, id: &str) -> Result<String> {
        if id.trim().is_empty() {
            return Err(RestError::Argument("ID must not be empty".to_string()));
        }
        if id == "." || id == ".." {
            return Err(RestError::Argument(format!("invalid ID {:?}", id)));
        }
        Ok(format!(
            "{}/{}",
            self.resource_slug.trim_end_matches('/'),
            urlencoding::encode(id)
        ))
    }

    /// Create a resource and return the identifier taken from the last
    /// segment of the `Location` header
    pub fn create(&self, data: Value) -> Result<String> {
        let response = self.client.post(&self.resource_slug, Params::new(), data)?;

        if response.status != StatusCode::CREATED {
            return Err(unexpected_status(&response, "Unable to CREATE resource"));
        }

        let location = response.location().ok_or_else(|| {
            RestError::Response(ApiProblem::message(
                500,
                "Response from server missing \"Location\" header",
            ))
        })?;

        let id = extract_id(location);
        if id.is_empty() {
            return Err(RestError::Response(ApiProblem::message(
                500,
                "Unable to extract entity identifier from Location header in API response",
            )));
        }

        tracing::debug!(resource = %self.resource_slug, %id, "created resource");
        Ok(id.to_string())
    }

    /// Fetch one resource. Returns `None` when the server answers 200 with
    /// a body carrying no entity (see [`Body::is_falsy`]).
    pub fn fetch(&self, id: &str) -> Result<Option<ResultSet>> {
        let path = self.entity_path(id)?;
        let response = self.client.get(&path, Params::new())?;

        if response.status != StatusCode::OK {
            return Err(unexpected_status(&response, "Unable to GET resource"));
        }

        if response.body.is_falsy() {
            return Ok(None);
        }

        let item = match response.body {
            Body::Json(value) => value,
            Body::Raw(bytes) => Value::String(String::from_utf8_lossy(&bytes).into_owned()),
        };
        Ok(Some(ResultSet::single(item)))
    }

    /// Fetch the collection, filtered by `params`
    pub fn fetch_all(&self, params: Params) -> Result<ResultSet> {
        let response = self.client.get(&self.resource_slug, params)?;

        if response.status != StatusCode::OK {
            return Err(unexpected_status(&response, "Unable to GET resource"));
        }

        if response.is_hal() {
            let document = response.body.as_json().cloned().unwrap_or(Value::Null);
            return ResultSet::from_hal(&document, &self.collection_key).ok_or_else(|| {
                RestError::Response(ApiProblem::message(
                    response.status.as_u16(),
                    format!(
                        "HAL response has no embedded \"{}\" collection",
                        self.collection_key
                    ),
                ))
            });
        }

        match response.body {
            Body::Json(Value::Array(items)) => Ok(ResultSet::new(items)),
            ref body if body.is_empty() => Ok(ResultSet::default()),
            _ => Err(RestError::Response(ApiProblem::message(
                response.status.as_u16(),
                "Expected a collection in API response",
            ))),
        }
    }

    /// Update (patch) a resource
    pub fn update(&self, id: &str, data: Value, params: Params) -> Result<RestResponse> {
        let path = self.entity_path(id)?;
        self.client.patch(&path, params, data)
    }

    /// Update (patch) every resource matching `params`
    pub fn update_all(&self, data: Value, params: Params) -> Result<RestResponse> {
        self.client.patch(&self.resource_slug, params, data)
    }

    /// Replace (put) a resource
    pub fn replace(&self, _id: &str, _data: Value) -> Result<RestResponse> {
        Err(RestError::NotImplemented("replace".to_string()))
    }

    /// Replace (put) a collection
    pub fn replace_all(&self, _data: Value) -> Result<RestResponse> {
        Err(RestError::NotImplemented("replace_all".to_string()))
    }
}

fn unexpected_status(response: &RestResponse, message: &str) -> RestError {
    let status = response.status;
    RestError::Response(ApiProblem::message(
        status.as_u16(),
        format!(
            "{}: unexpected status {} {}",
            message,
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        )
        .trim_end()
        .to_string(),
    ))
}

/// Last path segment of a `Location` value, ignoring query and fragment
fn extract_id(location: &str) -> &str {
    let path = location
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    path.rsplit('/').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::request::params;
    use crate::transport::mock::{json_reply, reply, MockTransport};
    use reqwest::Method;
    use serde_json::json;
    use std::sync::Arc;

    fn client_with(responses: Vec<crate::response::HttpResponse>) -> (RestClient, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new(responses));
        let client = RestClient::new(ClientConfig::new("http://api.test"), transport.clone());
        (client, transport)
    }

    #[test]
    fn test_extract_id() {
        assert_eq!(extract_id("http://api.test/users/42"), "42");
        assert_eq!(extract_id("/users/42?expand=1#top"), "42");
        assert_eq!(extract_id("42"), "42");
        assert_eq!(extract_id("http://api.test/users/"), "");
    }

    #[test]
    fn test_collection_key_defaults_to_last_segment() {
        let (client, _) = client_with(vec![]);
        assert_eq!(RestGateway::new("admin/users/", &client).collection_key(), "users");
        assert_eq!(
            RestGateway::new("users", &client).with_collection_key("items").collection_key(),
            "items"
        );
    }

    #[test]
    fn test_create_returns_location_id() {
        let (client, transport) = client_with(vec![reply(
            201,
            &[("Location", "http://api.test/users/42")],
            "",
        )]);
        let gateway = RestGateway::new("users", &client);

        let id = gateway.create(json!({"name": "a"})).unwrap();
        assert_eq!(id, "42");

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.url.as_str(), "http://api.test/users");
    }

    #[test]
    fn test_create_requires_201() {
        let (client, _) = client_with(vec![json_reply(200, r#"{"id": 1}"#)]);
        let error = RestGateway::new("users", &client).create(json!({})).unwrap_err();

        match error {
            RestError::Response(ref problem) => assert_eq!(problem.status, 200),
            other => panic!("expected RestError::Response, got {:?}", other),
        }
    }

    #[test]
    fn test_create_missing_location() {
        let (client, _) = client_with(vec![json_reply(201, "{}")]);
        let error = RestGateway::new("users", &client).create(json!({})).unwrap_err();
        assert!(matches!(error, RestError::Response(_)));
    }

    #[test]
    fn test_create_empty_id_segment() {
        let (client, _) = client_with(vec![reply(201, &[("Location", "http://api.test/users/")], "")]);
        let error = RestGateway::new("users", &client).create(json!({})).unwrap_err();
        assert!(matches!(error, RestError::Response(_)));
    }

    #[test]
    fn test_fetch_empty_id_makes_no_request() {
        let (client, transport) = client_with(vec![]);
        let gateway = RestGateway::new("users", &client);

        assert!(matches!(gateway.fetch(""), Err(RestError::Argument(_))));
        assert!(matches!(gateway.fetch("  "), Err(RestError::Argument(_))));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_fetch_id_stays_one_segment() {
        let cases = [
            ("a/b", "http://api.test/users/a%2Fb"),
            ("7?admin=1", "http://api.test/users/7%3Fadmin%3D1"),
            ("7#frag", "http://api.test/users/7%23frag"),
            ("../x", "http://api.test/users/..%2Fx"),
            ("john doe", "http://api.test/users/john%20doe"),
        ];
        let responses = cases.iter().map(|_| json_reply(200, "{}")).collect();
        let (client, transport) = client_with(responses);
        let gateway = RestGateway::new("users", &client);

        for (id, _) in &cases {
            gateway.fetch(id).unwrap();
        }

        let requests = transport.requests();
        for (request, (id, expected)) in requests.iter().zip(&cases) {
            assert_eq!(request.url.as_str(), *expected, "id {:?}", id);
            assert!(request.url.query().is_none());
            assert!(request.url.fragment().is_none());
        }
    }

    #[test]
    fn test_dot_segment_ids_rejected() {
        let (client, transport) = client_with(vec![]);
        let gateway = RestGateway::new("users", &client);

        assert!(matches!(gateway.fetch(".."), Err(RestError::Argument(_))));
        assert!(matches!(gateway.fetch("."), Err(RestError::Argument(_))));
        assert!(matches!(
            gateway.update("..", json!({}), Params::new()),
            Err(RestError::Argument(_))
        ));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_fetch_wraps_single_result() {
        let (client, transport) = client_with(vec![json_reply(200, r#"{"id": 7, "name": "g"}"#)]);
        let set = RestGateway::new("users", &client).fetch("7").unwrap().unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.first().unwrap()["name"], "g");
        assert_eq!(transport.requests()[0].url.as_str(), "http://api.test/users/7");
    }

    #[test]
    fn test_fetch_empty_body_is_none() {
        let bodies = ["null", "false", "0", "\"\"", "[]", ""];
        let (client, _) = client_with(bodies.iter().map(|b| json_reply(200, b)).collect());
        let gateway = RestGateway::new("users", &client);

        for body in bodies {
            assert!(gateway.fetch("7").unwrap().is_none(), "body {:?}", body);
        }
    }

    #[test]
    fn test_fetch_error_statuses() {
        let (client, _) = client_with(vec![
            reply(404, &[], ""),
            reply(409, &[], ""),
            reply(500, &[], ""),
            reply(304, &[], ""),
            json_reply(204, ""),
        ]);
        let gateway = RestGateway::new("users", &client);

        assert!(matches!(gateway.fetch("7"), Err(RestError::Resource(_))));
        assert!(matches!(gateway.fetch("7"), Err(RestError::Client(_))));
        assert!(matches!(gateway.fetch("7"), Err(RestError::Server(_))));

        let redirect = gateway.fetch("7").unwrap_err();
        assert!(matches!(redirect, RestError::Response(_)));
        assert_eq!(redirect.status_code(), Some(304));

        assert!(matches!(gateway.fetch("7"), Err(RestError::Response(_))));
    }

    #[test]
    fn test_fetch_all_plain_array() {
        let (client, transport) = client_with(vec![json_reply(200, r#"[{"id": 1}, {"id": 2}]"#)]);
        let set = RestGateway::new("users", &client)
            .fetch_all(params([("status", "active")]))
            .unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.pagination().is_none());
        assert_eq!(
            transport.requests()[0].url.as_str(),
            "http://api.test/users?status=active"
        );
    }

    #[test]
    fn test_fetch_all_hal() {
        let body = json!({
            "_links": {"self": {"href": "/users?page=1"}, "next": {"href": "/users?page=2"}},
            "_embedded": {"users": [{"id": 1}]},
            "page": 1,
            "page_count": 2,
            "total_items": 2
        });
        let (client, _) = client_with(vec![reply(
            200,
            &[("Content-Type", "application/hal+json")],
            &body.to_string(),
        )]);

        let set = RestGateway::new("users", &client).fetch_all(Params::new()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.links().next.as_deref(), Some("/users?page=2"));
        assert_eq!(set.pagination().unwrap().total_items, Some(2));
    }

    #[test]
    fn test_fetch_all_rejects_non_collection() {
        let (client, _) = client_with(vec![json_reply(200, r#"{"id": 1}"#)]);
        let error = RestGateway::new("users", &client).fetch_all(Params::new()).unwrap_err();
        assert!(matches!(error, RestError::Response(_)));
    }

    #[test]
    fn test_update_patches_entity() {
        let (client, transport) = client_with(vec![json_reply(200, r#"{"id": 7}"#)]);
        let gateway = RestGateway::new("users", &client);

        let response = gateway
            .update("7", json!({"name": "new"}), params([("notify", "0")]))
            .unwrap();
        assert_eq!(response.body, Body::Json(json!({"id": 7})));

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::PATCH);
        assert_eq!(sent.url.as_str(), "http://api.test/users/7?notify=0");
        assert!(matches!(gateway.update("", json!({}), Params::new()), Err(RestError::Argument(_))));
    }

    #[test]
    fn test_update_all_patches_collection() {
        let (client, transport) = client_with(vec![reply(204, &[], "")]);
        RestGateway::new("users", &client)
            .update_all(json!({"active": false}), params([("group", "x")]))
            .unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::PATCH);
        assert_eq!(sent.url.as_str(), "http://api.test/users?group=x");
    }

    #[test]
    fn test_replace_not_implemented() {
        let (client, transport) = client_with(vec![]);
        let gateway = RestGateway::new("users", &client);

        assert!(matches!(gateway.replace("1", json!({})), Err(RestError::NotImplemented(_))));
        assert!(matches!(gateway.replace("", Value::Null), Err(RestError::NotImplemented(_))));
        assert!(matches!(gateway.replace_all(json!([])), Err(RestError::NotImplemented(_))));
        assert_eq!(transport.request_count(), 0);
    }
}
