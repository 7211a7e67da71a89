//! # Lighthouse Engine
//!
//! One value per node that owns the configuration, the shared state, the
//! handler registry and every component built on them. There are no
//! globals: two engines in one process are fully independent, which is
//! how the integration tests run whole chains.
//!
//! Lifecycle:
//!
//! ```text
//! new ──► serve control surface ──► initialize ──► monitor ticks ──► shutdown
//!                                   (active role:
//!                                    reset descendants,
//!                                    start workload)
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::callbacks::{HandlerRegistry, StartContext};
use crate::errors::{FailoverError, FailoverResult};
use crate::http_server::{HttpServer, HttpServerConfig};
use crate::monitor::HealthMonitor;
use crate::observability::{log_event, log_event_with_fields, Event, MetricsRegistry};
use crate::peer::PeerClient;
use crate::promotion::PromotionCoordinator;
use crate::protocol::StatusReport;
use crate::registry::NodeConfig;
use crate::state::{self, NodeState, SharedState};
use crate::status::StatusMachine;
use crate::sync::UpdatePropagation;

/// A lighthouse node
pub struct Lighthouse {
    config: NodeConfig,
    instance_id: Uuid,
    state: SharedState,
    metrics: Arc<MetricsRegistry>,
    status: StatusMachine,
    propagation: UpdatePropagation,
    coordinator: PromotionCoordinator,
    monitor: HealthMonitor,
    shutdown_tx: broadcast::Sender<()>,
}

impl Lighthouse {
    /// Build an engine. The configuration is validated here; handlers must
    /// be registered before this call.
    pub fn new(config: NodeConfig, handlers: HandlerRegistry) -> FailoverResult<Arc<Self>> {
        if let Err(e) = config.validate() {
            log_event_with_fields(Event::ConfigRejected, &[("error", e.to_string().as_str())]);
            return Err(e.into());
        }

        let metrics = Arc::new(MetricsRegistry::new());
        let state = state::shared(NodeState::from_config(&config));
        let handlers = Arc::new(handlers);
        let peers = PeerClient::new(config.settings.peer_timeout, Arc::clone(&metrics))?;

        let start_context = StartContext {
            self_addr: config.self_addr.clone(),
            port: config.settings.pass_transport.then(|| config.port()),
        };
        let status = StatusMachine::new(
            Arc::clone(&state),
            Arc::clone(&handlers),
            start_context,
            config.settings.temp_status_timeout,
            Arc::clone(&metrics),
        );
        let propagation = UpdatePropagation::new(
            Arc::clone(&state),
            handlers,
            peers.clone(),
            config.self_addr.clone(),
            Arc::clone(&metrics),
        );
        let coordinator = PromotionCoordinator::new(
            Arc::clone(&state),
            status.clone(),
            propagation.clone(),
            peers.clone(),
            config.self_addr.clone(),
            Arc::clone(&metrics),
        );
        let monitor = HealthMonitor::new(
            Arc::clone(&state),
            status.clone(),
            coordinator.clone(),
            peers,
            config.self_addr.clone(),
            config.settings.clone(),
            Arc::clone(&metrics),
        );
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Arc::new(Self {
            config,
            instance_id: Uuid::new_v4(),
            state,
            metrics,
            status,
            propagation,
            coordinator,
            monitor,
            shutdown_tx,
        }))
    }

    /// Load, validate and build.
    pub fn from_config_file(path: &Path, handlers: HandlerRegistry) -> FailoverResult<Arc<Self>> {
        let config = NodeConfig::load(path).map_err(|e| {
            log_event_with_fields(Event::ConfigRejected, &[("error", e.to_string().as_str())]);
            FailoverError::from(e)
        })?;
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("self", config.self_addr.as_str()), ("role", config.role.as_config_str())],
        );
        Self::new(config, handlers)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Random id minted at construction, reported on `/status`
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn status_machine(&self) -> &StatusMachine {
        &self.status
    }

    pub fn propagation(&self) -> &UpdatePropagation {
        &self.propagation
    }

    pub fn coordinator(&self) -> &PromotionCoordinator {
        &self.coordinator
    }

    pub fn monitor(&self) -> &HealthMonitor {
        &self.monitor
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Snapshot served on `GET /status`.
    pub fn status_report(&self) -> StatusReport {
        let guard = state::lock(&self.state);
        StatusReport {
            status: guard.status.name().to_string(),
            mode: Some(guard.mode),
            slaves: guard.topology.descendants().to_vec(),
            parent_addr: guard.topology.parent().map(str::to_string),
            name: self.config.name.clone(),
            message: guard.status.message().map(str::to_string),
            expires_at: guard.status.expires_at(),
            instance_id: Some(self.instance_id),
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Control surface router, for hosts that serve it on their own
    /// listener (`pass_transport`).
    pub fn router(self: &Arc<Self>) -> Router {
        HttpServer::new(HttpServerConfig::from_node_config(&self.config), Arc::clone(self)).router()
    }

    /// Role-specific startup. A node configured active resets its
    /// descendants and starts the workload; a standby does nothing.
    pub async fn initialize(&self) -> FailoverResult<()> {
        if self.config.is_active_role() {
            self.coordinator.assume_configured_active().await?;
        }
        Ok(())
    }

    /// Start the health monitor task. It stops on `shutdown()`.
    pub fn spawn_monitor(&self) -> JoinHandle<()> {
        let monitor = self.monitor.clone();
        let shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move { monitor.run(shutdown).await })
    }

    /// Serve the control surface on `listener` until `shutdown()`.
    ///
    /// Subscribes to shutdown before returning, so a `shutdown()` issued
    /// before the future is first polled is not lost.
    pub fn serve_on(
        self: &Arc<Self>,
        listener: TcpListener,
    ) -> impl Future<Output = FailoverResult<()>> + Send + 'static {
        let server = HttpServer::new(HttpServerConfig::from_node_config(&self.config), Arc::clone(self));
        server.serve(listener, self.shutdown_tx.subscribe())
    }

    /// Run the node until Ctrl-C.
    ///
    /// Without `pass_transport` the control surface is bound on
    /// `bind_host` and the port of `self_addr` before anything else, so
    /// descendants can reach this node as soon as it starts acting.
    pub async fn run(self: Arc<Self>) -> FailoverResult<()> {
        log_event_with_fields(
            Event::BootStart,
            &[("self", self.config.self_addr.as_str()), ("role", self.config.role.as_config_str())],
        );

        let server = if self.config.settings.pass_transport {
            None
        } else {
            let listener = HttpServerConfig::from_node_config(&self.config).bind().await?;
            Some(tokio::spawn(self.serve_on(listener)))
        };

        if let Err(e) = self.initialize().await {
            log_event_with_fields(Event::CallbackFailed, &[("error", e.to_string().as_str())]);
        }
        let monitor = self.spawn_monitor();

        if let Err(e) = tokio::signal::ctrl_c().await {
            log_event_with_fields(Event::ShutdownStart, &[("signal_error", e.to_string().as_str())]);
        }
        self.shutdown();

        let _ = monitor.await;
        if let Some(server) = server {
            match server.await {
                Ok(result) => result?,
                Err(e) => return Err(FailoverError::Transport(e.to_string())),
            }
        }
        log_event(Event::ShutdownComplete);
        Ok(())
    }

    /// Stop the monitor and the control surface. Does not stop the workload.
    pub fn shutdown(&self) {
        log_event(Event::ShutdownStart);
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{OperatingMode, Status};

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]);
        config.parent_addr = None;

        let err = Lighthouse::new(config, HandlerRegistry::new()).err().unwrap();
        assert!(err.is_fatal());
        assert!(matches!(err, FailoverError::Config(_)));
    }

    #[test]
    fn test_zero_monitor_interval_is_rejected_before_spawn() {
        let settings = crate::registry::EngineSettings {
            monitor_interval: std::time::Duration::ZERO,
            ..Default::default()
        };
        let config = NodeConfig::active("127.0.0.1:9001", vec![]).with_settings(settings);

        let err = Lighthouse::new(config, HandlerRegistry::new()).err().unwrap();
        assert!(matches!(err, FailoverError::Config(_)));
    }

    #[test]
    fn test_status_report_for_fresh_standby() {
        let config = NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec!["127.0.0.1:9003".into()])
            .with_name("edge-2");
        let engine = Lighthouse::new(config, HandlerRegistry::new()).unwrap();

        let report = engine.status_report();
        assert_eq!(report.status, "waiting");
        assert_eq!(report.mode, Some(OperatingMode::Standby));
        assert_eq!(report.slaves, vec!["127.0.0.1:9003".to_string()]);
        assert_eq!(report.parent_addr.as_deref(), Some("127.0.0.1:9001"));
        assert_eq!(report.name.as_deref(), Some("edge-2"));
        assert_eq!(report.instance_id, Some(engine.instance_id()));
    }

    #[tokio::test]
    async fn test_initialize_starts_configured_active() {
        let engine = Lighthouse::new(
            NodeConfig::active("127.0.0.1:9001", vec![]),
            HandlerRegistry::new(),
        )
        .unwrap();

        engine.initialize().await.unwrap();
        assert_eq!(engine.status_machine().status(), Status::Running);
    }

    #[tokio::test]
    async fn test_initialize_leaves_standby_waiting() {
        let engine = Lighthouse::new(
            NodeConfig::standby("127.0.0.1:9002", "127.0.0.1:9001", vec![]),
            HandlerRegistry::new(),
        )
        .unwrap();

        engine.initialize().await.unwrap();
        assert_eq!(engine.status_machine().status(), Status::Waiting);
    }
}
