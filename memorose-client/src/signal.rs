//! Classification of a single attempt's outcome.
//!
//! Nodes report leadership problems through literal markers in JSON bodies.
//! [`RoutingSignal::classify`] is the only place those markers are matched;
//! the router works exclusively on the resulting variant.

use crate::transport::{Reply, TransportResult};
use reqwest::StatusCode;
use serde_json::Value;

/// `status` value a follower returns with HTTP 200 when it will not serve a write.
pub const REDIRECT_STATUS: &str = "redirect";

/// `error` value a follower returns with HTTP 503.
pub const NOT_LEADER_ERROR: &str = "Not Leader";

/// What one attempt tells the router about cluster topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingSignal {
    /// HTTP 200 without a redirect marker.
    Success,
    /// HTTP 200 carrying `"status": "redirect"`.
    Redirect {
        /// Leader named by the node, if any. Informational only.
        leader_id: Option<u64>,
    },
    /// HTTP 503 carrying `"error": "Not Leader"`.
    NotLeader {
        /// Free-form hint from the node. Informational only.
        hint: Option<String>,
    },
    /// The node could not be reached.
    TransportFailure {
        /// Underlying error text.
        reason: String,
    },
    /// Anything else: application errors, unmarked 503s, other transport errors.
    Other,
}

impl RoutingSignal {
    /// Classify the outcome of one transport call.
    pub fn classify(outcome: &TransportResult) -> Self {
        match outcome {
            Ok(reply) => Self::from_reply(reply),
            Err(err) if err.is_unreachable() => RoutingSignal::TransportFailure {
                reason: err.to_string(),
            },
            Err(_) => RoutingSignal::Other,
        }
    }

    /// Classify a response that was received from a node.
    ///
    /// Bodies that fail to parse are never routing signals.
    pub fn from_reply(reply: &Reply) -> Self {
        match reply.status {
            StatusCode::OK => match json_object(reply) {
                Some(body) if str_field(&body, "status") == Some(REDIRECT_STATUS) => {
                    RoutingSignal::Redirect {
                        leader_id: body.get("leader_id").and_then(Value::as_u64),
                    }
                }
                _ => RoutingSignal::Success,
            },
            StatusCode::SERVICE_UNAVAILABLE => match json_object(reply) {
                Some(body) if str_field(&body, "error") == Some(NOT_LEADER_ERROR) => {
                    RoutingSignal::NotLeader {
                        hint: str_field(&body, "hint").map(str::to_string),
                    }
                }
                _ => RoutingSignal::Other,
            },
            _ => RoutingSignal::Other,
        }
    }

    /// Whether the router should move to the next endpoint and try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RoutingSignal::Redirect { .. }
                | RoutingSignal::NotLeader { .. }
                | RoutingSignal::TransportFailure { .. }
        )
    }
}

fn json_object(reply: &Reply) -> Option<serde_json::Map<String, Value>> {
    match serde_json::from_slice::<Value>(&reply.body) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn str_field<'a>(body: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str)
}
