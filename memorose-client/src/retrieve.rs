//! Memory retrieval.

use crate::client::Client;
use crate::error::Result;
use crate::types::{RetrieveRequest, RetrieveResponse};

impl Client {
    /// Search this client's stream with a natural-language query.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unreachable or the query fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use memorose_client::Client;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = Client::new(["http://localhost:3000"], "tenant-demo")?;
    /// let response = client.retrieve_memory("What storage does Memorose use?").await?;
    /// for hit in &response.results {
    ///     println!("[{:.2}] {}", hit.score.unwrap_or_default(), hit.content().unwrap_or("???"));
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn retrieve_memory(&self, query: impl Into<String>) -> Result<RetrieveResponse> {
        self.retrieve(RetrieveRequest::new(query)).await
    }

    /// Run a retrieval query with explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unreachable or the query fails.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use memorose_client::{Client, RetrieveRequest};
    /// # use chrono::{Duration, Utc};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let client = Client::new(["http://localhost:3000"], "tenant-demo")?;
    /// let request = RetrieveRequest::new("Explain Raft.")
    ///     .with_time_range(Some(Utc::now() - Duration::days(7)), None)
    ///     .with_min_score(0.3);
    /// let response = client.retrieve(request).await?;
    /// println!("{} results", response.results.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn retrieve(&self, request: RetrieveRequest) -> Result<RetrieveResponse> {
        let path = self.stream_path("retrieve");
        let reply = self.post(&path, &request).await?;
        self.handle_response(reply)
    }
}
