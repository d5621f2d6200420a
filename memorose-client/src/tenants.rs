//! Tenant management.

use crate::client::Client;
use crate::error::Result;

impl Client {
    /// Delete all data belonging to a tenant.
    ///
    /// Deletes this client's own tenant when `tenant_id` is `None`. The
    /// request itself is always sent with this client's tenant header.
    ///
    /// # Returns
    ///
    /// Returns the server's acknowledgement body unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unreachable or the deletion fails.
    pub async fn delete_tenant(&self, tenant_id: Option<&str>) -> Result<serde_json::Value> {
        let target = tenant_id.unwrap_or_else(|| self.tenant_id());
        let path = format!("/v1/tenants/{}", urlencoding::encode(target));
        let reply = self.delete(&path).await?;
        self.handle_response(reply)
    }
}
