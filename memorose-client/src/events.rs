//! Event ingestion.

use crate::client::Client;
use crate::error::Result;
use crate::types::{IngestRequest, IngestResponse};

impl Client {
    /// Ingest a text event into this client's stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unreachable or the server rejects
    /// the event.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use memorose_client::Client;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = Client::new(["http://localhost:3000"], "tenant-demo")?;
    /// let accepted = client
    ///     .ingest_event("Memorose uses RocksDB and LanceDB for storage.")
    ///     .await?;
    /// println!("{}: {}", accepted.status, accepted.event_id);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn ingest_event(&self, content: impl Into<String>) -> Result<IngestResponse> {
        self.ingest(IngestRequest::new(self.tenant_id(), content))
            .await
    }

    /// Ingest a fully specified event into this client's stream.
    ///
    /// Writes are retried across nodes on leader changes and may be applied
    /// more than once if a node accepted the write before rejecting it.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unreachable or the server rejects
    /// the event.
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestResponse> {
        let path = self.stream_path("events");
        let reply = self.post(&path, &request).await?;
        self.handle_response(reply)
    }
}
