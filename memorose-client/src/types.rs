//! Request and response types for the Memorose API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of content carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Plain text.
    #[default]
    Text,
    /// Image URL or base64 data.
    Image,
    /// Audio URL or base64 data.
    Audio,
    /// A JSON document encoded as a string.
    Json,
}

/// Payload for ingesting one event into a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Tenant the event belongs to.
    pub tenant_id: String,
    /// Event content.
    pub content: String,
    /// Content kind; the server assumes text when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    /// Target memory level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    /// Parent task identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Task status label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_status: Option<String>,
    /// Task progress in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_progress: Option<f32>,
}

impl IngestRequest {
    /// Create a text event for `tenant_id`.
    pub fn new(tenant_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            content: content.into(),
            content_type: None,
            level: None,
            parent_id: None,
            task_status: None,
            task_progress: None,
        }
    }

    /// Set the content kind.
    #[must_use]
    pub fn with_content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Set the target memory level.
    #[must_use]
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    /// Attach task metadata.
    #[must_use]
    pub fn with_task(
        mut self,
        parent_id: Option<String>,
        status: impl Into<String>,
        progress: f32,
    ) -> Self {
        self.parent_id = parent_id;
        self.task_status = Some(status.into());
        self.task_progress = Some(progress);
        self
    }
}

/// Response from ingesting an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Server-side status (e.g. "accepted").
    pub status: String,
    /// Identifier assigned to the event.
    pub event_id: Uuid,
}

/// Payload for a retrieval query against a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveRequest {
    /// Natural-language query.
    pub query: String,
    /// Lower bound of the validity window.
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Upper bound of the validity window.
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Return embeddings with each result.
    #[serde(default)]
    pub include_vector: bool,
    /// Let the server arbitrate conflicting memories.
    #[serde(default)]
    pub enable_arbitration: bool,
    /// Minimum relevance score for a result to be returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,
    /// Number of graph hops to expand results through.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_depth: Option<usize>,
    /// Only consider memories recorded at or before this instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

impl RetrieveRequest {
    /// Create a query with server defaults for everything else.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            start_time: None,
            end_time: None,
            include_vector: false,
            enable_arbitration: false,
            min_score: None,
            graph_depth: None,
            as_of: None,
        }
    }

    /// Restrict results to a validity window. Either bound may be open.
    #[must_use]
    pub fn with_time_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    /// Drop results scoring below `min_score`.
    #[must_use]
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = Some(min_score);
        self
    }

    /// Expand results through the memory graph up to `depth` hops.
    #[must_use]
    pub fn with_graph_depth(mut self, depth: usize) -> Self {
        self.graph_depth = Some(depth);
        self
    }

    /// Query the state as of a past instant.
    #[must_use]
    pub fn as_of(mut self, at: DateTime<Utc>) -> Self {
        self.as_of = Some(at);
        self
    }

    /// Return each result's embedding alongside it.
    #[must_use]
    pub fn include_vector(mut self, include: bool) -> Self {
        self.include_vector = include;
        self
    }

    /// Ask the server to arbitrate between conflicting memories.
    #[must_use]
    pub fn enable_arbitration(mut self, enable: bool) -> Self {
        self.enable_arbitration = enable;
        self
    }
}

/// Response from a retrieval query.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrieveResponse {
    /// Stream that was searched.
    #[serde(default)]
    pub stream_id: Option<Uuid>,
    /// Query echoed back by the server.
    #[serde(default)]
    pub query: Option<String>,
    /// Matching memory units, best first.
    #[serde(default)]
    pub results: Vec<ScoredMemory>,
}

/// One retrieval hit.
///
/// The server sends `[unit, score]` pairs. The unit is passed through as
/// opaque JSON; anything that is not a pair is kept as an unscored unit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawResult")]
pub struct ScoredMemory {
    /// The memory unit as returned by the server.
    pub unit: serde_json::Value,
    /// Relevance score, when provided.
    pub score: Option<f32>,
}

impl ScoredMemory {
    /// Text content of the unit, if it has any.
    pub fn content(&self) -> Option<&str> {
        self.unit.get("content").and_then(serde_json::Value::as_str)
    }

    /// Identifier of the unit, if it has one.
    pub fn id(&self) -> Option<&str> {
        self.unit.get("id").and_then(serde_json::Value::as_str)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawResult {
    Scored(serde_json::Value, f32),
    Bare(serde_json::Value),
}

impl From<RawResult> for ScoredMemory {
    fn from(raw: RawResult) -> Self {
        match raw {
            RawResult::Scored(unit, score) => Self {
                unit,
                score: Some(score),
            },
            RawResult::Bare(unit) => Self { unit, score: None },
        }
    }
}

/// Consolidation backlog across all shards of the answering node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStatus {
    /// Events not yet consolidated.
    pub pending: usize,
    /// True when nothing is pending.
    pub ready: bool,
}
