//! HTTP Server Configuration
//!
//! Where the control surface listens and which browser origins may call it.
//! Derived from the node configuration: the port is the one in `self_addr`.

use serde::Serialize;
use tokio::net::TcpListener;

use crate::errors::{FailoverError, FailoverResult};
use crate::registry::NodeConfig;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpServerConfig {
    /// Host to bind to (default: "0.0.0.0")
    pub host: String,

    /// Port to bind to, taken from `self_addr`
    pub port: u16,

    /// CORS allowed origins; empty means permissive
    pub cors_origins: Vec<String>,
}

impl HttpServerConfig {
    pub fn from_node_config(config: &NodeConfig) -> Self {
        Self {
            host: config.bind_host.clone(),
            port: config.port(),
            cors_origins: config.cors_origins.clone(),
        }
    }

    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Bind a listener on `socket_addr`.
    pub async fn bind(&self) -> FailoverResult<TcpListener> {
        let addr = self.socket_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|e| FailoverError::Transport(format!("failed to bind {}: {}", addr, e)))
    }
}
