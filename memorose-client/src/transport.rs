//! Transport seam between the router and the network.
//!
//! The router only ever talks to a [`Transport`]: one call sends one request
//! to one node and yields either a [`Reply`] or a [`TransportError`]. The
//! default implementation, [`HttpTransport`], is a thin wrapper around
//! `reqwest`; tests substitute scripted transports.

use crate::error::{ClientError, Result};
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// HTTP method of a routed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A request as handed to the transport, independent of the target node.
#[derive(Debug, Clone)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Absolute path, always starting with `/`.
    pub path: String,
    /// Outgoing headers, including the routing headers.
    pub headers: HeaderMap,
    /// Optional JSON body.
    pub body: Option<serde_json::Value>,
}

/// A complete response from one node.
#[derive(Debug, Clone)]
pub struct Reply {
    /// Response status.
    pub status: StatusCode,
    /// Raw response body.
    pub body: Bytes,
}

impl Reply {
    /// Build a reply from a status and a raw body.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Build a reply whose body is the given JSON value.
    pub fn json_body(status: StatusCode, body: &serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(ClientError::Deserialize)
    }
}

/// Failure to obtain any response from a node.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// No connection could be made (refused, reset, DNS, connect timeout).
    #[error("node {endpoint} is unreachable: {reason}")]
    Unreachable {
        /// Node that was targeted.
        endpoint: String,
        /// Underlying error text.
        reason: String,
    },

    /// Any other transport failure, such as a read timeout.
    #[error("request to {endpoint} failed: {reason}")]
    Failed {
        /// Node that was targeted.
        endpoint: String,
        /// Underlying error text.
        reason: String,
    },
}

impl TransportError {
    /// Whether the node could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, TransportError::Unreachable { .. })
    }
}

/// Outcome of a single transport call.
pub type TransportResult = std::result::Result<Reply, TransportError>;

/// Type alias for async transport futures.
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = TransportResult> + Send + 'a>>;

/// Sends a single request to a single node.
///
/// Implementations must not retry; the router owns retry and failover.
pub trait Transport: Send + Sync {
    /// Send `request` to the node at base URL `endpoint`.
    fn send<'a>(&'a self, endpoint: &'a str, request: &'a Request) -> TransportFuture<'a>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
}

impl HttpTransport {
    /// Create a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    /// Wrap an existing `reqwest` client.
    pub fn with_client(http: HttpClient) -> Self {
        Self { http }
    }

    async fn execute(&self, endpoint: &str, request: &Request) -> TransportResult {
        let url = url(endpoint, &request.path);
        let mut builder = self
            .http
            .request(request.method.into(), &url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_error(endpoint, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Failed {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Reply { status, body })
    }
}

impl Transport for HttpTransport {
    fn send<'a>(&'a self, endpoint: &'a str, request: &'a Request) -> TransportFuture<'a> {
        Box::pin(self.execute(endpoint, request))
    }
}

/// Join a node base URL and a request path.
pub(crate) fn url(endpoint: &str, path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{}/{}", endpoint.trim_end_matches('/'), path)
}

/// Split `reqwest` errors into "never reached the node" and everything else.
fn classify_error(endpoint: &str, err: reqwest::Error) -> TransportError {
    let endpoint = endpoint.to_string();
    let reason = err.to_string();

    if err.is_connect() || (err.is_request() && !err.is_timeout()) {
        TransportError::Unreachable { endpoint, reason }
    } else {
        TransportError::Failed { endpoint, reason }
    }
}
