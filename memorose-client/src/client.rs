//! Core Memorose client implementation.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::router::ClusterRouter;
use crate::transport::{Method, Reply};
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// A client for a Memorose cluster.
///
/// Every operation goes through a [`ClusterRouter`], so callers never see
/// leader changes or node outages unless the whole cluster is unreachable.
///
/// # Example
///
/// ```no_run
/// use memorose_client::Client;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = Client::new(
///     ["http://localhost:3000", "http://localhost:3001", "http://localhost:3002"],
///     "tenant-demo",
/// )?;
///
/// let accepted = client.ingest_event("Raft is a consensus algorithm.").await?;
/// println!("Ingested {}", accepted.event_id);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Client {
    /// Router shared by all operations.
    router: ClusterRouter,
    /// Stream that events are ingested into and retrieved from.
    stream_id: Uuid,
}

impl Client {
    /// Create a client for the given candidate nodes and tenant.
    ///
    /// A fresh random stream identifier is assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if no endpoint is given, an endpoint URL is invalid,
    /// or the HTTP client cannot be created.
    pub fn new(
        endpoints: impl IntoIterator<Item = impl Into<String>>,
        tenant_id: impl Into<String>,
    ) -> Result<Self> {
        Self::from_config(ClientConfig::new(endpoints, tenant_id))
    }

    /// Create a client from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        Ok(Self::with_router(ClusterRouter::from_config(&config)?))
    }

    /// Create a client on top of an existing router.
    pub fn with_router(router: ClusterRouter) -> Self {
        Self {
            router,
            stream_id: Uuid::new_v4(),
        }
    }

    /// Use a specific stream instead of the random one.
    #[must_use]
    pub fn with_stream_id(mut self, stream_id: Uuid) -> Self {
        self.stream_id = stream_id;
        self
    }

    /// Stream this client reads and writes.
    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    /// Tenant identifier attached to every request.
    pub fn tenant_id(&self) -> &str {
        self.router.tenant_id()
    }

    /// The underlying router.
    pub fn router(&self) -> &ClusterRouter {
        &self.router
    }

    /// Path of a per-stream resource.
    pub(crate) fn stream_path(&self, resource: &str) -> String {
        format!("/v1/streams/{}/{}", self.stream_id, resource)
    }

    /// Execute a routed GET request.
    pub(crate) async fn get(&self, path: &str) -> Result<Reply> {
        self.router
            .perform(Method::Get, path, None, HeaderMap::new())
            .await
    }

    /// Execute a routed POST request with a JSON body.
    pub(crate) async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Reply> {
        let body = serde_json::to_value(body)?;
        self.router
            .perform(Method::Post, path, Some(body), HeaderMap::new())
            .await
    }

    /// Execute a routed DELETE request.
    pub(crate) async fn delete(&self, path: &str) -> Result<Reply> {
        self.router
            .perform(Method::Delete, path, None, HeaderMap::new())
            .await
    }

    /// Deserialize a successful reply, or turn a failed one into an API error.
    pub(crate) fn handle_response<T: DeserializeOwned>(&self, reply: Reply) -> Result<T> {
        if reply.is_success() {
            reply.json()
        } else {
            Err(api_error(&reply))
        }
    }
}

/// Build an `Api` error, preferring the `error` or `message` JSON field.
fn api_error(reply: &Reply) -> ClientError {
    let body = reply.text();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| {
            json["error"]
                .as_str()
                .or_else(|| json["message"].as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);

    ClientError::Api {
        status: reply.status.as_u16(),
        message,
    }
}
