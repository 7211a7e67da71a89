//! In-process chain harness
//!
//! Every node is a real engine serving its control surface on an ephemeral
//! 127.0.0.1 port. Listeners are bound before configs are written so that
//! nodes can name each other. Monitors are not spawned; tests drive ticks
//! by hand.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lighthouse::errors::FailoverResult;
use lighthouse::registry::EngineSettings;
use lighthouse::{HandlerRegistry, Lighthouse, NodeConfig};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const PEER_TIMEOUT: Duration = Duration::from_millis(300);

/// Settings tuned for tests: short peer timeout, no stagger.
pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        monitor_interval: Duration::from_secs(1),
        peer_timeout: PEER_TIMEOUT,
        promotion_stagger: Duration::ZERO,
        temp_status_timeout: Duration::from_secs(60),
        pass_transport: false,
        reassert_descendants: false,
    }
}

/// A bound listener and the address it answers on.
pub struct Slot {
    pub listener: TcpListener,
    pub addr: String,
}

pub async fn slot() -> Slot {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    Slot { listener, addr }
}

/// An address nothing listens on.
pub async fn dead_addr() -> String {
    let Slot { listener, addr } = slot().await;
    drop(listener);
    addr
}

/// An address that accepts connections and never answers.
pub async fn black_hole() -> (String, JoinHandle<()>) {
    let Slot { listener, addr } = slot().await;
    let handle = tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    (addr, handle)
}

/// Counts callback invocations.
#[derive(Clone, Default)]
pub struct Calls {
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub updates: Arc<AtomicUsize>,
}

impl Calls {
    pub fn handlers(&self) -> HandlerRegistry {
        let (starts, stops, updates) = (
            Arc::clone(&self.starts),
            Arc::clone(&self.stops),
            Arc::clone(&self.updates),
        );
        HandlerRegistry::new()
            .on_start(move |_| {
                starts.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on_stop(move |_| {
                stops.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on_update(move |_| {
                updates.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

/// A serving node
pub struct TestNode {
    pub engine: Arc<Lighthouse>,
    pub addr: String,
    pub calls: Calls,
    server: JoinHandle<FailoverResult<()>>,
}

impl TestNode {
    /// Serve `config` on the slot's listener with counting handlers.
    pub fn serve(slot: Slot, config: NodeConfig) -> Self {
        Self::serve_tuned(slot, config, fast_settings())
    }

    /// Like `serve`, with explicit engine settings.
    pub fn serve_tuned(slot: Slot, config: NodeConfig, settings: EngineSettings) -> Self {
        let calls = Calls::default();
        let handlers = calls.handlers();
        Self::launch(slot, config.with_settings(settings), handlers, calls)
    }

    /// Serve with caller-supplied handlers; `calls` stays at zero.
    pub fn serve_with_handlers(slot: Slot, config: NodeConfig, handlers: HandlerRegistry) -> Self {
        Self::launch(slot, config.with_settings(fast_settings()), handlers, Calls::default())
    }

    fn launch(slot: Slot, config: NodeConfig, handlers: HandlerRegistry, calls: Calls) -> Self {
        let engine = Lighthouse::new(config, handlers).unwrap();
        let server = tokio::spawn(engine.serve_on(slot.listener));
        Self {
            engine,
            addr: slot.addr,
            calls,
            server,
        }
    }

    /// Stop serving and wait until the port is closed.
    pub async fn kill(self) {
        self.engine.shutdown();
        let abort = self.server.abort_handle();
        if tokio::time::timeout(Duration::from_secs(5), self.server).await.is_err() {
            abort.abort();
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Plain HTTP client for assertions from the outside.
pub fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .no_proxy()
        .build()
        .unwrap()
}
