//! Leader discovery and request routing across a fixed set of nodes.
//!
//! The router keeps a belief about which endpoint is the current leader and
//! sends every request there first. When an attempt produces a routing signal
//! it moves to the next endpoint and tries again, up to `N + 1` attempts for
//! `N` endpoints.
//!
//! ```text
//!                 ┌──────────────┐  success / other   ┌───────────┐
//!   perform ─────►│  ATTEMPTING  ├───────────────────►│ returned  │
//!                 └──┬────────▲──┘                    └───────────┘
//!   redirect,        │        │ budget left
//!   not leader,      ▼        │
//!   unreachable   advance pointer ── budget spent ──► ClusterUnreachable
//! ```
//!
//! The pointer is never reset: a later call starts from whatever endpoint the
//! previous call ended on.

use crate::config::{ClientConfig, validate_endpoint};
use crate::error::{ClientError, Result};
use crate::signal::RoutingSignal;
use crate::transport::{HttpTransport, Method, Reply, Request, Transport};
use parking_lot::Mutex;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Header carrying the tenant identifier.
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Routes requests to the cluster leader, following leader changes.
///
/// Clones share the endpoint set and the leader pointer, so topology learned
/// by one clone is visible to the others. Callers that want independent
/// beliefs should build separate routers.
#[derive(Clone)]
pub struct ClusterRouter {
    endpoints: Arc<[String]>,
    tenant_id: Arc<str>,
    tenant_header: HeaderValue,
    /// Index of the endpoint currently believed to be the leader.
    leader: Arc<Mutex<usize>>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ClusterRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterRouter")
            .field("endpoints", &self.endpoints)
            .field("tenant_id", &self.tenant_id)
            .field("leader", &self.leader_index())
            .finish_non_exhaustive()
    }
}

impl ClusterRouter {
    /// Create a router over `endpoints` using the given transport.
    ///
    /// The first endpoint is the initial leader guess.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint set is empty, an endpoint is not an
    /// HTTP(S) URL, or the tenant identifier cannot be sent as a header.
    pub fn new(
        endpoints: impl IntoIterator<Item = impl Into<String>>,
        tenant_id: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let endpoints: Vec<String> = endpoints.into_iter().map(Into::into).collect();
        if endpoints.is_empty() {
            return Err(ClientError::Config(
                "at least one endpoint is required".to_string(),
            ));
        }
        for endpoint in &endpoints {
            validate_endpoint(endpoint)?;
        }

        let tenant_id = tenant_id.into();
        if tenant_id.is_empty() {
            return Err(ClientError::Config("tenant_id is required".to_string()));
        }
        let tenant_header = HeaderValue::from_str(&tenant_id).map_err(|_| {
            ClientError::Config(format!(
                "tenant_id is not a valid header value: {:?}",
                tenant_id
            ))
        })?;

        Ok(Self {
            endpoints: endpoints.into(),
            tenant_id: tenant_id.into(),
            tenant_header,
            leader: Arc::new(Mutex::new(0)),
            transport,
        })
    }

    /// Create a router that talks HTTP, from a configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be created.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.timeout())?;
        Self::new(
            config.endpoints.iter().cloned(),
            config.tenant_id.clone(),
            Arc::new(transport),
        )
    }

    /// The endpoint set, in construction order.
    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Tenant identifier attached to every request.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Maximum number of attempts for one call.
    pub fn attempt_budget(&self) -> usize {
        self.endpoints.len() + 1
    }

    /// Index of the endpoint currently believed to be the leader.
    pub fn leader_index(&self) -> usize {
        *self.leader.lock()
    }

    /// Endpoint currently believed to be the leader.
    pub fn leader_endpoint(&self) -> &str {
        &self.endpoints[self.leader_index()]
    }

    /// Send a request to the leader, following redirects and failover.
    ///
    /// `x-tenant-id` and `content-type` are always set by the router and
    /// override any caller-supplied values.
    ///
    /// Returns the first response that is not a routing signal, whatever its
    /// status. Retries are not deduplicated: a write observed as rejected may
    /// still have been applied, so delivery is at-least-once.
    ///
    /// # Errors
    ///
    /// - `ClusterUnreachable` if every attempt in the budget hit a routing signal
    /// - `Transport` for a transport failure that is not a connection failure
    pub async fn perform(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        headers: HeaderMap,
    ) -> Result<Reply> {
        self.perform_with_cancel(method, path, body, headers, &CancellationToken::new())
            .await
    }

    /// Like [`perform`](Self::perform), stopping early once `cancel` fires.
    ///
    /// Cancellation is checked before every attempt and while an attempt is in
    /// flight. A cancelled call does not move the leader pointer any further.
    ///
    /// # Errors
    ///
    /// As for `perform`, plus `Cancelled`.
    pub async fn perform_with_cancel(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        headers: HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<Reply> {
        let request = Request {
            method,
            path: normalize_path(path),
            headers: self.routing_headers(headers),
            body,
        };
        let budget = self.attempt_budget();

        for attempt in 1..=budget {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled {
                    attempts: attempt - 1,
                });
            }

            let (index, endpoint) = self.current();
            tracing::debug!(
                attempt,
                budget,
                endpoint,
                method = %request.method,
                path = %request.path,
                "sending request"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(ClientError::Cancelled { attempts: attempt - 1 });
                }
                outcome = self.transport.send(endpoint, &request) => outcome,
            };

            let signal = RoutingSignal::classify(&outcome);
            if !signal.is_retryable() {
                return outcome.map_err(ClientError::from);
            }

            match signal {
                RoutingSignal::Redirect { leader_id } => {
                    tracing::info!(endpoint, ?leader_id, "node redirected to leader");
                }
                RoutingSignal::NotLeader { hint } => {
                    tracing::info!(
                        endpoint,
                        hint = hint.as_deref().unwrap_or("unknown"),
                        "node is not leader, retrying"
                    );
                }
                RoutingSignal::TransportFailure { reason } => {
                    tracing::warn!(endpoint, %reason, "node is offline, trying next");
                }
                RoutingSignal::Success | RoutingSignal::Other => {}
            }

            self.advance(index);
        }

        tracing::warn!(
            attempts = budget,
            endpoints = self.endpoints.len(),
            "all nodes in cluster are unreachable or failed"
        );
        Err(ClientError::ClusterUnreachable {
            attempts: budget,
            endpoints: self.endpoints.len(),
        })
    }

    /// Snapshot of the leader pointer and its endpoint.
    fn current(&self) -> (usize, &str) {
        let index = *self.leader.lock();
        (index, self.endpoints[index].as_str())
    }

    /// Move past endpoint `from`, unless another caller already has.
    fn advance(&self, from: usize) {
        let mut leader = self.leader.lock();
        if *leader == from {
            *leader = (from + 1) % self.endpoints.len();
        }
    }

    fn routing_headers(&self, mut headers: HeaderMap) -> HeaderMap {
        headers.insert(
            HeaderName::from_static(TENANT_HEADER),
            self.tenant_header.clone(),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{TransportError, TransportFuture, TransportResult};
    use reqwest::StatusCode;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Replays a fixed list of outcomes and records every request it sees.
    struct ScriptedTransport {
        script: Mutex<VecDeque<TransportResult>>,
        calls: Mutex<Vec<(String, Request)>>,
    }

    impl ScriptedTransport {
        fn new(script: impl IntoIterator<Item = TransportResult>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn targets(&self) -> Vec<String> {
            self.calls.lock().iter().map(|(e, _)| e.clone()).collect()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().len()
        }
    }

    impl Transport for ScriptedTransport {
        fn send<'a>(&'a self, endpoint: &'a str, request: &'a Request) -> TransportFuture<'a> {
            self.calls
                .lock()
                .push((endpoint.to_string(), request.clone()));
            let outcome = self
                .script
                .lock()
                .pop_front()
                .unwrap_or_else(|| ok(json!({"status": "ok"})));
            Box::pin(async move { outcome })
        }
    }

    fn ok(body: serde_json::Value) -> TransportResult {
        Ok(Reply::json_body(StatusCode::OK, &body))
    }

    fn redirect() -> TransportResult {
        ok(json!({"status": "redirect", "leader_id": 2}))
    }

    fn not_leader() -> TransportResult {
        Ok(Reply::json_body(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({"error": "Not Leader", "hint": "Unknown"}),
        ))
    }

    fn offline() -> TransportResult {
        Err(TransportError::Unreachable {
            endpoint: "scripted".to_string(),
            reason: "connection refused".to_string(),
        })
    }

    fn nodes(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("http://node{}:3000", i)).collect()
    }

    fn router(n: usize, transport: Arc<ScriptedTransport>) -> ClusterRouter {
        ClusterRouter::new(nodes(n), "tenant-a", transport).unwrap()
    }

    async fn get(router: &ClusterRouter) -> Result<Reply> {
        router
            .perform(Method::Get, "/v1/status/pending", None, HeaderMap::new())
            .await
    }

    #[test]
    fn construction_validates_inputs() {
        let transport = ScriptedTransport::new([]);
        assert!(matches!(
            ClusterRouter::new(Vec::<String>::new(), "t", transport.clone()),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClusterRouter::new(["localhost:3000"], "t", transport.clone()),
            Err(ClientError::InvalidUrl(_))
        ));
        assert!(matches!(
            ClusterRouter::new(["http://a:3000"], "", transport.clone()),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ClusterRouter::new(["http://a:3000"], "bad\ntenant", transport),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn initial_state() {
        let router = router(3, ScriptedTransport::new([]));
        assert_eq!(router.leader_index(), 0);
        assert_eq!(router.leader_endpoint(), "http://node0:3000");
        assert_eq!(router.attempt_budget(), 4);
        assert_eq!(router.tenant_id(), "tenant-a");
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let transport = ScriptedTransport::new([ok(json!({"pending": 0}))]);
        let router = router(3, transport.clone());

        let reply = get(&router).await.unwrap();
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(router.leader_index(), 0);
    }

    #[tokio::test]
    async fn n_rejections_then_success_on_the_last_attempt() {
        for n in 1..=5 {
            let mut script: Vec<TransportResult> = (0..n).map(|_| not_leader()).collect();
            script.push(ok(json!({"status": "accepted"})));
            let transport = ScriptedTransport::new(script);
            let router = router(n, transport.clone());

            let reply = get(&router).await.unwrap();
            assert_eq!(reply.status(), StatusCode::OK, "n = {n}");
            assert_eq!(transport.call_count(), n + 1, "n = {n}");
            // Advanced exactly n times around a ring of n.
            assert_eq!(router.leader_index(), 0, "n = {n}");
        }
    }

    #[tokio::test]
    async fn budget_exhaustion_is_exact() {
        for n in 1..=4 {
            let script: Vec<TransportResult> = (0..n + 1)
                .map(|i| match i % 3 {
                    0 => offline(),
                    1 => redirect(),
                    _ => not_leader(),
                })
                .chain([ok(json!({"never": "reached"}))])
                .collect();
            let transport = ScriptedTransport::new(script);
            let router = router(n, transport.clone());

            match get(&router).await {
                Err(ClientError::ClusterUnreachable {
                    attempts,
                    endpoints,
                }) => {
                    assert_eq!(attempts, n + 1);
                    assert_eq!(endpoints, n);
                }
                other => panic!("expected ClusterUnreachable, got {:?}", other),
            }
            assert_eq!(transport.call_count(), n + 1, "n = {n}");
        }
    }

    #[tokio::test]
    async fn follows_mixed_signals_and_remembers_leader() {
        let transport =
            ScriptedTransport::new([not_leader(), offline(), ok(json!({"status": "accepted"}))]);
        let router = router(3, transport.clone());

        let reply = get(&router).await.unwrap();
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(
            transport.targets(),
            vec![
                "http://node0:3000",
                "http://node1:3000",
                "http://node2:3000"
            ]
        );
        assert_eq!(router.leader_endpoint(), "http://node2:3000");

        // Next call starts at the discovered leader.
        get(&router).await.unwrap();
        assert_eq!(transport.targets()[3], "http://node2:3000");
    }

    #[tokio::test]
    async fn pointer_wraps_to_first_endpoint() {
        let transport = ScriptedTransport::new([offline(), offline(), offline()]);
        let router = router(3, transport.clone());

        get(&router).await.unwrap();
        assert_eq!(
            transport.targets(),
            vec![
                "http://node0:3000",
                "http://node1:3000",
                "http://node2:3000",
                "http://node0:3000"
            ]
        );
        assert_eq!(router.leader_index(), 0);
    }

    #[tokio::test]
    async fn unmarked_503_is_returned_without_retry() {
        let transport = ScriptedTransport::new([Ok(Reply::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "upstream overloaded",
        ))]);
        let router = router(3, transport.clone());

        let reply = get(&router).await.unwrap();
        assert_eq!(reply.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(reply.text(), "upstream overloaded");
        assert_eq!(transport.call_count(), 1);
        assert_eq!(router.leader_index(), 0);
    }

    #[tokio::test]
    async fn application_errors_pass_through() {
        let transport = ScriptedTransport::new([Ok(Reply::json_body(
            StatusCode::NOT_FOUND,
            &json!({"error": "not found"}),
        ))]);
        let router = router(2, transport.clone());

        let reply = get(&router).await.unwrap();
        assert_eq!(reply.status(), StatusCode::NOT_FOUND);
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn non_connection_transport_error_is_surfaced() {
        let transport = ScriptedTransport::new([Err(TransportError::Failed {
            endpoint: "http://node0:3000".to_string(),
            reason: "operation timed out".to_string(),
        })]);
        let router = router(3, transport.clone());

        let err = get(&router).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(transport.call_count(), 1);
        assert_eq!(router.leader_index(), 0);
    }

    #[tokio::test]
    async fn routing_headers_override_caller_values() {
        let transport = ScriptedTransport::new([]);
        let router = router(1, transport.clone());

        let mut headers = HeaderMap::new();
        headers.insert(TENANT_HEADER, HeaderValue::from_static("someone-else"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert("x-request-id", HeaderValue::from_static("req-1"));

        router
            .perform(
                Method::Post,
                "v1/streams/s/events",
                Some(json!({"content": "hi"})),
                headers,
            )
            .await
            .unwrap();

        let calls = transport.calls.lock();
        let (_, request) = &calls[0];
        assert_eq!(request.path, "/v1/streams/s/events");
        assert_eq!(request.headers[TENANT_HEADER], "tenant-a");
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
        assert_eq!(request.headers["x-request-id"], "req-1");
        assert_eq!(request.body, Some(json!({"content": "hi"})));
    }

    #[tokio::test]
    async fn repeated_calls_are_independent() {
        let transport = ScriptedTransport::new([ok(json!({"n": 1})), ok(json!({"n": 2}))]);
        let router = router(2, transport.clone());

        let first: serde_json::Value = get(&router).await.unwrap().json().unwrap();
        let second: serde_json::Value = get(&router).await.unwrap().json().unwrap();
        assert_eq!(first["n"], 1);
        assert_eq!(second["n"], 2);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn clones_share_the_leader_pointer() {
        let transport = ScriptedTransport::new([not_leader()]);
        let router = router(3, transport.clone());
        let clone = router.clone();

        get(&router).await.unwrap();
        assert_eq!(clone.leader_index(), 1);
    }

    #[test]
    fn stale_advance_is_ignored() {
        let router = router(3, ScriptedTransport::new([]));
        router.advance(0);
        assert_eq!(router.leader_index(), 1);

        // A second caller that also attempted index 0 must not skip node 1.
        router.advance(0);
        assert_eq!(router.leader_index(), 1);
    }

    #[tokio::test]
    async fn cancelled_before_first_attempt() {
        let transport = ScriptedTransport::new([]);
        let router = router(3, transport.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = router
            .perform_with_cancel(Method::Get, "/", None, HeaderMap::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled { attempts: 0 }));
        assert_eq!(transport.call_count(), 0);
        assert_eq!(router.leader_index(), 0);
    }

    /// Answers "Not Leader" and cancels the token, either when the attempt
    /// is issued or when its reply is produced.
    struct CancellingTransport {
        cancel: CancellationToken,
        on_reply: bool,
        calls: Mutex<usize>,
    }

    impl CancellingTransport {
        fn new(cancel: &CancellationToken, on_reply: bool) -> Arc<Self> {
            Arc::new(Self {
                cancel: cancel.clone(),
                on_reply,
                calls: Mutex::new(0),
            })
        }
    }

    impl Transport for CancellingTransport {
        fn send<'a>(&'a self, _endpoint: &'a str, _request: &'a Request) -> TransportFuture<'a> {
            *self.calls.lock() += 1;
            if !self.on_reply {
                self.cancel.cancel();
            }
            let cancel = self.cancel.clone();
            let on_reply = self.on_reply;
            Box::pin(async move {
                if on_reply {
                    cancel.cancel();
                }
                not_leader()
            })
        }
    }

    #[tokio::test]
    async fn cancellation_is_checked_between_attempts() {
        let cancel = CancellationToken::new();
        let transport = CancellingTransport::new(&cancel, true);
        let router = ClusterRouter::new(nodes(3), "tenant-a", transport.clone()).unwrap();

        let err = router
            .perform_with_cancel(Method::Get, "/", None, HeaderMap::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled { attempts: 1 }));
        assert_eq!(*transport.calls.lock(), 1);
        assert_eq!(router.leader_index(), 1);
    }

    #[tokio::test]
    async fn cancellation_before_reply_does_not_advance() {
        let cancel = CancellationToken::new();
        let transport = CancellingTransport::new(&cancel, false);
        let router = ClusterRouter::new(nodes(3), "tenant-a", transport.clone()).unwrap();

        let err = router
            .perform_with_cancel(Method::Get, "/", None, HeaderMap::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled { attempts: 0 }));
        assert_eq!(*transport.calls.lock(), 1);
        assert_eq!(router.leader_index(), 0);
    }

    /// Never completes.
    struct HangingTransport;

    impl Transport for HangingTransport {
        fn send<'a>(&'a self, _endpoint: &'a str, _request: &'a Request) -> TransportFuture<'a> {
            Box::pin(std::future::pending())
        }
    }

    #[tokio::test]
    async fn cancellation_interrupts_in_flight_attempt() {
        let router = ClusterRouter::new(nodes(2), "tenant-a", Arc::new(HangingTransport)).unwrap();
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = router
            .perform_with_cancel(Method::Get, "/", None, HeaderMap::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Cancelled { attempts: 0 }));
        assert_eq!(router.leader_index(), 0);
    }
}
