//! Peer HTTP client
//!
//! Every call is bounded by the configured peer timeout. Failures come back
//! as `FailoverError::PeerUnreachable` and are never retried here.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::errors::{FailoverError, FailoverResult};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::protocol::{StatusReport, SyncReport, TopologyNotice};
use crate::sync::CachedUpdate;

use super::classification::PeerClassification;

/// Client for other lighthouse nodes' control surfaces
#[derive(Debug, Clone)]
pub struct PeerClient {
    http: reqwest::Client,
    timeout: Duration,
    metrics: Arc<MetricsRegistry>,
}

impl PeerClient {
    pub fn new(timeout: Duration, metrics: Arc<MetricsRegistry>) -> FailoverResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| FailoverError::Transport(format!("failed to build peer client: {}", e)))?;

        Ok(Self {
            http,
            timeout,
            metrics,
        })
    }

    fn endpoint(addr: &str, path: &str) -> String {
        format!("http://{}/{}", addr, path.trim_start_matches('/'))
    }

    /// Run one peer call under the timeout, recording any failure.
    async fn bounded<T, F>(&self, addr: &str, call: F) -> FailoverResult<T>
    where
        F: Future<Output = Result<T, reqwest::Error>>,
    {
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(FailoverError::peer_unreachable(addr, e)),
            Err(_) => Err(FailoverError::peer_unreachable(
                addr,
                format!("no response within {}ms", self.timeout.as_millis()),
            )),
        };

        if let Err(e) = &result {
            self.metrics.increment_peer_failures();
            log_event_with_fields(
                Event::PeerUnreachable,
                &[("peer", addr), ("error", e.to_string().as_str())],
            );
        }
        result
    }

    // =========================================================================
    // PROBES
    // =========================================================================

    /// `GET /status`
    pub async fn fetch_status(&self, addr: &str) -> FailoverResult<StatusReport> {
        let request = self.http.get(Self::endpoint(addr, "/status"));
        self.bounded(addr, async move {
            request.send().await?.error_for_status()?.json::<StatusReport>().await
        })
        .await
    }

    /// Probe and classify a peer. Any failure is `Down`.
    pub async fn classify(&self, addr: &str) -> PeerClassification {
        match self.fetch_status(addr).await {
            Ok(report) => PeerClassification::from_status(&report.status),
            Err(_) => PeerClassification::Down,
        }
    }

    /// True only if the peer answers and reports "running".
    pub async fn is_running(&self, addr: &str) -> bool {
        matches!(self.fetch_status(addr).await, Ok(report) if report.status == "running")
    }

    // =========================================================================
    // UPDATES
    // =========================================================================

    /// `POST /update`
    pub async fn push_update(&self, addr: &str, payload: &Value) -> FailoverResult<()> {
        let request = self.http.post(Self::endpoint(addr, "/update")).json(payload);
        self.bounded(addr, async move {
            request.send().await?.error_for_status()?;
            Ok(())
        })
        .await
    }

    /// `GET /sync`
    pub async fn fetch_update(&self, addr: &str) -> FailoverResult<Option<CachedUpdate>> {
        let request = self.http.get(Self::endpoint(addr, "/sync"));
        self.bounded(addr, async move {
            let report = request.send().await?.error_for_status()?.json::<SyncReport>().await?;
            Ok(report.into_update())
        })
        .await
    }

    // =========================================================================
    // TOPOLOGY
    // =========================================================================

    /// `POST /topology`: tell `addr` that `new_parent` is now its parent.
    pub async fn send_topology_notice(&self, addr: &str, new_parent: &str) -> FailoverResult<()> {
        let notice = TopologyNotice {
            parent_addr: new_parent.to_string(),
        };
        let request = self.http.post(Self::endpoint(addr, "/topology")).json(&notice);
        self.bounded(addr, async move {
            request.send().await?.error_for_status()?;
            Ok(())
        })
        .await
    }

    /// `POST /reset`
    pub async fn send_reset(&self, addr: &str) -> FailoverResult<()> {
        let request = self.http.post(Self::endpoint(addr, "/reset"));
        self.bounded(addr, async move {
            request.send().await?.error_for_status()?;
            Ok(())
        })
        .await
    }
}
