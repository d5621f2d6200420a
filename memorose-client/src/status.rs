//! Cluster status probes.

use crate::client::Client;
use crate::error::Result;
use crate::types::PendingStatus;

impl Client {
    /// Number of events still waiting for consolidation.
    ///
    /// Useful for waiting until freshly ingested events become retrievable.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unreachable or the request fails.
    pub async fn pending_status(&self) -> Result<PendingStatus> {
        let reply = self.get("/v1/status/pending").await?;
        self.handle_response(reply)
    }
}
