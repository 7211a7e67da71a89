//! # HTTP Server
//!
//! Combines the control and observability routers behind one CORS layer
//! and serves them until the engine shuts down.

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::engine::Lighthouse;
use crate::errors::{FailoverError, FailoverResult};
use crate::observability::{log_event_with_fields, Event};

use super::config::HttpServerConfig;
use super::control_routes::control_routes;
use super::observability_routes::observability_routes;

/// Control surface of one lighthouse node
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(config: HttpServerConfig, engine: Arc<Lighthouse>) -> Self {
        let router = Self::build_router(&config, engine);
        Self { config, router }
    }

    fn build_router(config: &HttpServerConfig, engine: Arc<Lighthouse>) -> Router {
        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(control_routes(Arc::clone(&engine)))
            .merge(observability_routes(engine))
            .layer(cors)
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    pub fn router(self) -> Router {
        self.router
    }

    /// Serve on an already bound listener until `shutdown` fires.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> FailoverResult<()> {
        let local = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| self.socket_addr());
        log_event_with_fields(Event::Serving, &[("addr", local.as_str())]);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| FailoverError::Transport(format!("control surface on {} failed: {}", local, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::HandlerRegistry;
    use crate::registry::NodeConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn engine() -> Arc<Lighthouse> {
        Lighthouse::new(NodeConfig::active("127.0.0.1:9001", vec![]), HandlerRegistry::new()).unwrap()
    }

    #[tokio::test]
    async fn test_router_serves_both_route_groups() {
        let e = engine();
        let router = HttpServer::new(HttpServerConfig::from_node_config(e.config()), Arc::clone(&e)).router();

        for uri in ["/status", "/sync", "/health", "/metrics"] {
            let response = router
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
        }
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let e = engine();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = broadcast::channel(1);
        let server = HttpServer::new(HttpServerConfig::from_node_config(e.config()), e);

        let handle = tokio::spawn(server.serve(listener, rx));
        tx.send(()).unwrap();

        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
