//! Leader-aware Rust client for a Memorose cluster.
//!
//! A Memorose cluster replicates writes through Raft; only the leader accepts
//! them. This crate hides that from callers: give it the candidate node
//! addresses and it finds the leader, forwards requests to it, and recovers
//! from leader changes and node outages on its own.
//!
//! # Features
//!
//! - Leader discovery by sequential failover over a fixed endpoint set
//! - Redirect and "Not Leader" handling, with a hard `N + 1` attempt bound
//! - Tenant isolation header on every request
//! - Event ingestion, retrieval, pending-status probe and tenant deletion
//! - Cancellation between and during attempts
//!
//! # Example
//!
//! ```no_run
//! use memorose_client::Client;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::new(
//!     ["http://localhost:3000", "http://localhost:3001", "http://localhost:3002"],
//!     "tenant-demo",
//! )?;
//!
//! client.ingest_event("Raft is a consensus algorithm for distributed systems.").await?;
//!
//! let response = client.retrieve_memory("Explain Raft.").await?;
//! for hit in &response.results {
//!     println!("{:?} {}", hit.score, hit.content().unwrap_or("???"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Routing
//!
//! Each call starts at the endpoint the router currently believes is the
//! leader. Three outcomes move it to the next endpoint and retry:
//!
//! | Outcome | Example |
//! |---------|---------|
//! | Node unreachable | connection refused, DNS failure |
//! | HTTP 200 with `"status": "redirect"` | follower echoing a leader hint |
//! | HTTP 503 with `"error": "Not Leader"` | follower rejecting a write |
//!
//! Everything else, including a 503 without that marker, is returned as-is.
//! After `N + 1` routing signals the call fails with
//! [`ClientError::ClusterUnreachable`].
//!
//! # Error Handling
//!
//! ```no_run
//! # use memorose_client::{Client, ClientError};
//! # async fn example() -> Result<(), ClientError> {
//! # let client = Client::new(["http://localhost:3000"], "tenant-demo")?;
//! match client.pending_status().await {
//!     Ok(status) => println!("{} events pending", status.pending),
//!     Err(ClientError::ClusterUnreachable { attempts, .. }) => {
//!         println!("no node answered after {} attempts", attempts)
//!     }
//!     Err(e) => println!("Error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod events;
mod retrieve;
mod router;
mod signal;
mod status;
mod tenants;
mod transport;
mod types;

pub use client::Client;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ClientError, Result};
pub use router::{ClusterRouter, TENANT_HEADER};
pub use signal::{NOT_LEADER_ERROR, REDIRECT_STATUS, RoutingSignal};
pub use transport::{
    HttpTransport, Method, Reply, Request, Transport, TransportError, TransportFuture,
    TransportResult,
};
pub use types::{
    ContentType, IngestRequest, IngestResponse, PendingStatus, RetrieveRequest, RetrieveResponse,
    ScoredMemory,
};

pub use tokio_util::sync::CancellationToken;
