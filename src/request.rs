use crate::error::{RestError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{Map, Value};
use url::Url;

/// Ordered query parameters.
pub type Params = Vec<(String, String)>;

/// Build [`Params`] from anything yielding key/value pairs
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

/// What the caller asked for. Built once per call and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the configured base URL
    pub path: String,
    pub params: Params,
    pub data: Option<Value>,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        RequestSpec {
            method,
            path: path.into(),
            params: Params::new(),
            data: None,
        }
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Methods whose payload travels as a JSON body
    pub fn has_body(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT || self.method == Method::PATCH
    }
}

/// Fully-formed outgoing request, handed to pre-send hooks for mutation and
/// then to the transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        HttpRequest {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    /// Resolve `spec` against `base_url`.
    ///
    /// Query parameters are attached for every method. POST, PUT and PATCH
    /// carry `spec.data` (or `{}`) as a JSON body.
    pub fn from_spec(base_url: &str, spec: &RequestSpec) -> Result<Self> {
        let mut url = Url::parse(&join_url(base_url, &spec.path))?;
        if !spec.params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(spec.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let mut request = HttpRequest::new(spec.method.clone(), url);

        if spec.has_body() {
            let body = match spec.data {
                Some(ref data) => serde_json::to_vec(data)?,
                None => serde_json::to_vec(&Value::Object(Map::new()))?,
            };
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            request.body = Some(body);
        }

        Ok(request)
    }

    /// Set a header, replacing any previous value
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| RestError::Argument(format!("invalid header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| RestError::Argument(format!("invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Path plus query, as used in digest `uri`
    pub fn request_uri(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

/// Join with exactly one `/` between base and path
fn join_url(base_url: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base_url.to_string();
    }
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}
