//! Update Propagation
//!
//! - push: the active node stores a payload and fans it out to descendants
//! - receive: a node stores a pushed payload and hands it to the workload
//! - sync: a newly promoted node pulls the freshest payload from descendants
//!
//! Delivery is best-effort and single-shot. There are no retries and no
//! ordering guarantees across nodes beyond `received_at`.
//!
//! The update handler runs outside the state lock. A separate delivery lock
//! keeps store-then-notify ordered, so the workload sees payloads in the
//! order they were cached.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use serde_json::Value;

use crate::callbacks::HandlerRegistry;
use crate::errors::{FailoverError, FailoverResult};
use crate::observability::{log_event_with_fields, Event, MetricsRegistry};
use crate::peer::PeerClient;
use crate::state::{self, SharedState};

use super::cache::{latest, CachedUpdate};

/// One descendant that did not accept a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub addr: String,
    pub reason: String,
}

/// Result of one push
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PushReport {
    pub received_at: DateTime<Utc>,
    pub delivered: Vec<String>,
    pub failed: Vec<DeliveryFailure>,
}

/// Result of pulling from descendants after promotion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// A descendant held a strictly newer payload; it is now the local cache
    Adopted {
        from: String,
        received_at: DateTime<Utc>,
    },
    /// Local cache kept; nothing newer was found
    KeptLocal {
        received_at: Option<DateTime<Utc>>,
    },
}

/// Moves shared-state payloads between nodes
#[derive(Clone)]
pub struct UpdatePropagation {
    state: SharedState,
    delivery: Arc<Mutex<()>>,
    handlers: Arc<HandlerRegistry>,
    peers: PeerClient,
    self_addr: String,
    metrics: Arc<MetricsRegistry>,
}

impl UpdatePropagation {
    pub fn new(
        state: SharedState,
        handlers: Arc<HandlerRegistry>,
        peers: PeerClient,
        self_addr: impl Into<String>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            state,
            delivery: Arc::new(Mutex::new(())),
            handlers,
            peers,
            self_addr: self_addr.into(),
            metrics,
        }
    }

    /// Latest cached payload, if any.
    pub fn current(&self) -> Option<CachedUpdate> {
        state::lock(&self.state).cache.current().cloned()
    }

    // =========================================================================
    // PUSH (active node)
    // =========================================================================

    /// Store `payload` locally and deliver it to every descendant.
    ///
    /// Fails with `NotActive` on a standby node. Otherwise always succeeds;
    /// per-descendant failures are reported, not raised.
    pub async fn push_update(&self, payload: Value) -> FailoverResult<PushReport> {
        self.push_update_at(payload, Utc::now()).await
    }

    pub async fn push_update_at(
        &self,
        payload: Value,
        now: DateTime<Utc>,
    ) -> FailoverResult<PushReport> {
        let (targets, received_at) = {
            let mut guard = state::lock(&self.state);
            if !guard.mode.is_active() {
                return Err(FailoverError::NotActive);
            }
            let stored = guard.cache.store(payload.clone(), now);
            (guard.topology.fan_out_targets(&self.self_addr), stored.received_at)
        };

        let results = join_all(
            targets
                .iter()
                .map(|addr| self.peers.push_update(addr, &payload)),
        )
        .await;

        let mut delivered = Vec::new();
        let mut failed = Vec::new();
        for (addr, result) in targets.into_iter().zip(results) {
            match result {
                Ok(()) => delivered.push(addr),
                Err(e) => failed.push(DeliveryFailure {
                    addr,
                    reason: e.to_string(),
                }),
            }
        }

        self.metrics.increment_updates_pushed();
        self.metrics.add_push_failures(failed.len() as u64);
        log_event_with_fields(
            Event::UpdatePushed,
            &[
                ("delivered", delivered.len().to_string().as_str()),
                ("failed", failed.len().to_string().as_str()),
            ],
        );

        Ok(PushReport {
            received_at,
            delivered,
            failed,
        })
    }

    // =========================================================================
    // RECEIVE (any node)
    // =========================================================================

    /// Store a pushed payload and invoke the update callback.
    ///
    /// Callback failures are logged; the payload stays stored.
    pub fn receive_update(&self, payload: Value) -> CachedUpdate {
        self.receive_update_at(payload, Utc::now())
    }

    pub fn receive_update_at(&self, payload: Value, now: DateTime<Utc>) -> CachedUpdate {
        let _delivery = self.begin_delivery();
        let stored = state::lock(&self.state).cache.store(payload, now);
        self.metrics.increment_updates_received();
        log_event_with_fields(
            Event::UpdateReceived,
            &[("received_at", stored.received_at.to_rfc3339().as_str())],
        );
        self.notify_workload(&stored.payload);
        stored
    }

    // =========================================================================
    // SYNC (after promotion)
    // =========================================================================

    /// Pull every descendant's cache and adopt the newest, if strictly
    /// newer than the local one. Unreachable descendants are skipped.
    ///
    /// An adopted payload is handed to the update callback like a push.
    pub async fn sync_from_descendants(&self) -> SyncOutcome {
        let targets = state::lock(&self.state)
            .topology
            .fan_out_targets(&self.self_addr);

        let results = join_all(targets.iter().map(|addr| self.peers.fetch_update(addr))).await;

        let responses = targets
            .into_iter()
            .zip(results)
            .filter_map(|(addr, result)| match result {
                Ok(Some(update)) => Some((addr, update)),
                _ => None,
            });
        let newest = latest(responses);

        let _delivery = self.begin_delivery();
        let (adopted, local_received_at) = {
            let mut guard = state::lock(&self.state);
            let adopted = newest.filter(|(_, update)| guard.cache.adopt_if_newer(update.clone()));
            (adopted, guard.cache.received_at())
        };
        match adopted {
            Some((from, update)) => {
                self.metrics.increment_syncs_adopted();
                log_event_with_fields(
                    Event::SyncAdopted,
                    &[
                        ("from", from.as_str()),
                        ("received_at", update.received_at.to_rfc3339().as_str()),
                    ],
                );
                self.notify_workload(&update.payload);
                SyncOutcome::Adopted {
                    from,
                    received_at: update.received_at,
                }
            }
            None => {
                log_event_with_fields(
                    Event::SyncKeptLocal,
                    &[(
                        "received_at",
                        local_received_at.map(|t| t.to_rfc3339()).unwrap_or_default().as_str(),
                    )],
                );
                SyncOutcome::KeptLocal {
                    received_at: local_received_at,
                }
            }
        }
    }

    fn begin_delivery(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify_workload(&self, payload: &Value) {
        if let Err(e) = self.handlers.invoke_update(payload) {
            self.metrics.increment_callback_failures();
            log_event_with_fields(Event::CallbackFailed, &[("error", e.to_string().as_str())]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::NodeConfig;
    use crate::state::NodeState;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn propagation(config: &NodeConfig, handlers: HandlerRegistry) -> UpdatePropagation {
        let metrics = Arc::new(MetricsRegistry::new());
        UpdatePropagation::new(
            state::shared(NodeState::from_config(config)),
            Arc::new(handlers),
            PeerClient::new(Duration::from_millis(200), Arc::clone(&metrics)).unwrap(),
            config.self_addr.clone(),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_push_on_standby_is_rejected() {
        let config = NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]);
        let p = propagation(&config, HandlerRegistry::new());

        let err = p.push_update(json!({"k": 1})).await.unwrap_err();
        assert!(matches!(err, FailoverError::NotActive));
        assert!(p.current().is_none());
    }

    #[tokio::test]
    async fn test_push_without_descendants_stores_locally() {
        let config = NodeConfig::active("127.0.0.1:9001", vec![]);
        let p = propagation(&config, HandlerRegistry::new());

        let report = p.push_update(json!({"k": 1})).await.unwrap();
        assert!(report.delivered.is_empty());
        assert!(report.failed.is_empty());
        assert_eq!(p.current().unwrap().payload, json!({"k": 1}));
    }

    #[tokio::test]
    async fn test_push_skips_self_in_descendants() {
        let config = NodeConfig::active("127.0.0.1:9001", vec!["127.0.0.1:9001".into()]);
        let p = propagation(&config, HandlerRegistry::new());

        let report = p.push_update(json!(1)).await.unwrap();
        assert!(report.delivered.is_empty());
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_receive_invokes_update_callback() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let config = NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]);
        let p = propagation(
            &config,
            HandlerRegistry::new().on_update(move |payload| {
                s.lock().unwrap().push(payload.clone());
                Ok(())
            }),
        );

        p.receive_update(json!({"k": 1}));
        p.receive_update(json!({"k": 2}));

        assert_eq!(*seen.lock().unwrap(), vec![json!({"k": 1}), json!({"k": 2})]);
        assert_eq!(p.current().unwrap().payload, json!({"k": 2}));
    }

    #[test]
    fn test_cache_readable_while_update_handler_runs() {
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
        let (entered_tx, release_rx) = (Mutex::new(entered_tx), Mutex::new(release_rx));
        let config = NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]);
        let p = propagation(
            &config,
            HandlerRegistry::new().on_update(move |_| {
                entered_tx.lock().unwrap().send(()).unwrap();
                release_rx.lock().unwrap().recv().unwrap();
                Ok(())
            }),
        );

        let receiving = {
            let p = p.clone();
            std::thread::spawn(move || p.receive_update(json!("slow")))
        };
        entered_rx.recv().unwrap();

        // Stored before the handler was called, readable while it blocks.
        assert_eq!(p.current().unwrap().payload, json!("slow"));

        release_tx.send(()).unwrap();
        receiving.join().unwrap();
    }

    #[test]
    fn test_receive_keeps_payload_when_callback_fails() {
        let config = NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]);
        let p = propagation(&config, HandlerRegistry::new().on_update(|_| Err("rejected".into())));

        p.receive_update(json!("kept"));
        assert_eq!(p.current().unwrap().payload, json!("kept"));
    }

    #[tokio::test]
    async fn test_sync_with_no_descendants_keeps_local() {
        let config = NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]);
        let p = propagation(&config, HandlerRegistry::new());

        assert_eq!(
            p.sync_from_descendants().await,
            SyncOutcome::KeptLocal { received_at: None }
        );
    }
}
