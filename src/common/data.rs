use std::{net::SocketAddr, time::Duration};

use bytes::Bytes;
use http::Request;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A request that was received by the mock server.
///
/// Requests are recorded in the order they arrived, before the response is produced. Use
/// [MockServer::take_request](crate::MockServer::take_request) and its siblings to retrieve
/// them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    index: usize,
    method: String,
    uri: String,
    path: String,
    query: Option<String>,
    version: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    remote_addr: Option<SocketAddr>,
}

impl RecordedRequest {
    pub(crate) fn from_request(
        index: usize,
        req: &Request<Bytes>,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        let uri = req.uri();
        let headers = req
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).to_string(),
                )
            })
            .collect();

        Self {
            index,
            method: req.method().as_str().to_string(),
            uri: uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| uri.to_string()),
            path: uri.path().to_string(),
            query: uri.query().map(|q| q.to_string()),
            version: format!("{:?}", req.version()),
            headers,
            body: req.body().clone(),
            remote_addr,
        }
    }

    /// The zero-based arrival position of this request on its server.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The HTTP method, e.g. `GET`.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The request target as it was sent by the client, usually path and query (e.g.
    /// `/search?q=rust`).
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The path of the request target, without the query string.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The raw query string, if the request target had one.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The URL-decoded query parameters in the order they appear in the request target.
    pub fn query_params(&self) -> Vec<(String, String)> {
        match &self.query {
            Some(query) => form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// The HTTP version, e.g. `HTTP/1.1`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All request headers in the order they were received. Names are lower case.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns the first value of the header with the given name. The lookup ignores case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body interpreted as UTF-8. Invalid sequences are replaced.
    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// Deserializes the body from JSON.
    pub fn body_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The address of the client that sent the request.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}

/// The response a [Handler](crate::Handler) hands back to the mock server.
///
/// A fresh `MockResponse` is a `200 OK` with no headers and an empty body.
///
/// ```
/// use mockwebserver::MockResponse;
/// use std::time::Duration;
///
/// let response = MockResponse::new()
///     .status(201)
///     .header("content-type", "text/plain")
///     .body("created")
///     .delay(Duration::from_millis(10));
///
/// assert_eq!(response.status_code(), 201);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub(crate) status: u16,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: Bytes,
    pub(crate) delay: Option<Duration>,
}

impl MockResponse {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: Bytes::new(),
            delay: None,
        }
    }

    /// Sets the HTTP status code.
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Adds a response header. Calling this repeatedly with the same name sends the header
    /// multiple times.
    pub fn header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body<B: Into<Bytes>>(mut self, body: B) -> Self {
        self.body = body.into();
        self
    }

    /// Sets a JSON body. This does not set the `Content-Type` header, use
    /// [header](MockResponse::header) for that.
    pub fn json_body<V: Into<serde_json::Value>>(mut self, body: V) -> Self {
        self.body = Bytes::from(body.into().to_string());
        self
    }

    /// Sets a JSON body from a serializable object.
    ///
    /// # Panics
    /// Panics if the object cannot be serialized into JSON.
    pub fn json_body_obj<T: Serialize>(self, body: &T) -> Self {
        let json_body =
            serde_json::to_value(body).expect("Failed to serialize object to JSON string");
        self.json_body(json_body)
    }

    /// Delays writing the response by the given duration. The delay starts after the handler
    /// returned.
    pub fn delay<D: Into<Duration>>(mut self, duration: D) -> Self {
        self.delay = Some(duration.into());
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self::new()
    }
}
