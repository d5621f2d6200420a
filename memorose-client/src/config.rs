//! Client configuration.

use crate::error::{ClientError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a cluster-aware client.
///
/// # Example
///
/// ```
/// use memorose_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .endpoint("http://10.0.0.1:3000")
///     .endpoint("http://10.0.0.2:3000")
///     .tenant_id("acme")
///     .build()
///     .unwrap();
///
/// assert_eq!(config.endpoints.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Candidate node base URLs, tried in order when searching for the leader.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Tenant identifier sent with every request.
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,

    /// Per-attempt transport timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_endpoints() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

fn default_tenant_id() -> String {
    "default".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            tenant_id: default_tenant_id(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given endpoints and tenant.
    pub fn new(
        endpoints: impl IntoIterator<Item = impl Into<String>>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            tenant_id: tenant_id.into(),
            ..Default::default()
        }
    }

    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Per-attempt timeout as a Duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(ClientError::Config(
                "at least one endpoint is required".to_string(),
            ));
        }

        for endpoint in &self.endpoints {
            validate_endpoint(endpoint)?;
        }

        if self.tenant_id.is_empty() {
            return Err(ClientError::Config("tenant_id is required".to_string()));
        }

        if self.timeout_ms == 0 {
            return Err(ClientError::Config("timeout_ms must be > 0".to_string()));
        }

        Ok(())
    }
}

/// Check that an endpoint is an absolute HTTP(S) base URL.
pub(crate) fn validate_endpoint(endpoint: &str) -> Result<()> {
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ClientError::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {}",
            endpoint
        )));
    }
    Ok(())
}

/// Builder for ClientConfig.
///
/// Starts with no endpoints; `build` fails unless at least one is added.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self {
            config: ClientConfig {
                endpoints: Vec::new(),
                ..Default::default()
            },
        }
    }
}

impl ClientConfigBuilder {
    /// Append a candidate endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoints.push(endpoint.into());
        self
    }

    /// Replace the endpoint set.
    pub fn endpoints(mut self, endpoints: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    /// Set the tenant identifier.
    pub fn tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        self.config.tenant_id = tenant_id.into();
        self
    }

    /// Set the per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
