//! Node Configuration
//!
//! Loaded once from a JSON file at startup and immutable afterwards:
//! - Role: master (Active) or slave (Standby)
//! - This node's address and, for a slave, its parent's
//! - The ordered list of descendants this node notifies
//! - Timing knobs for the monitor and the peer protocol

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigResult};

/// Configured role, fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Starts as the node running the workload ("master")
    Active,
    /// Watches a parent and takes over when it disappears ("slave")
    Standby,
}

impl Role {
    /// Parse the configuration file spelling.
    pub fn parse(raw: &str) -> ConfigResult<Self> {
        match raw {
            "master" => Ok(Role::Active),
            "slave" => Ok(Role::Standby),
            other => Err(ConfigError::invalid_role(other)),
        }
    }

    /// Configuration file spelling.
    pub fn as_config_str(&self) -> &'static str {
        match self {
            Role::Active => "master",
            Role::Standby => "slave",
        }
    }
}

/// On-disk schema. Every key is optional at the serde level so that
/// validation can report exactly which one is wrong.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    self_addr: Option<String>,
    #[serde(default)]
    parent_addr: Option<String>,
    #[serde(default)]
    slaves: Vec<String>,
    #[serde(default)]
    name: Option<String>,

    #[serde(default = "default_monitor_interval_secs")]
    monitor_interval_secs: u64,
    #[serde(default = "default_peer_timeout_ms")]
    peer_timeout_ms: u64,
    #[serde(default = "default_promotion_stagger_secs")]
    promotion_stagger_secs: u64,
    #[serde(default = "default_temp_status_timeout_secs")]
    temp_status_timeout_secs: u64,
    #[serde(default)]
    pass_transport: bool,
    #[serde(default)]
    reassert_descendants: bool,
    #[serde(default = "default_bind_host")]
    bind_host: String,
    #[serde(default)]
    cors_origins: Vec<String>,
}

fn default_monitor_interval_secs() -> u64 {
    5
}
fn default_peer_timeout_ms() -> u64 {
    2000
}
fn default_promotion_stagger_secs() -> u64 {
    5
}
fn default_temp_status_timeout_secs() -> u64 {
    300
}
fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

/// Engine timing and behavior knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineSettings {
    /// Period of the health monitor
    pub monitor_interval: Duration,
    /// Upper bound on every outbound peer call
    pub peer_timeout: Duration,
    /// Per-rank delay before a standby checks for a running peer
    pub promotion_stagger: Duration,
    /// Lifetime of a temporary status set through `stop` with a message
    pub temp_status_timeout: Duration,
    /// Hand the listen port to the start callback and leave serving to the host
    pub pass_transport: bool,
    /// Re-send the topology notice to descendants on every active tick
    pub reassert_descendants: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            monitor_interval: Duration::from_secs(default_monitor_interval_secs()),
            peer_timeout: Duration::from_millis(default_peer_timeout_ms()),
            promotion_stagger: Duration::from_secs(default_promotion_stagger_secs()),
            temp_status_timeout: Duration::from_secs(default_temp_status_timeout_secs()),
            pass_transport: false,
            reassert_descendants: false,
        }
    }
}

/// Validated node configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeConfig {
    pub role: Role,
    pub self_addr: String,
    /// Present iff `role` is `Standby`
    pub parent_addr: Option<String>,
    /// Peers this node notifies, in configured order
    pub descendants: Vec<String>,
    /// Cosmetic only
    pub name: Option<String>,
    pub settings: EngineSettings,
    pub bind_host: String,
    pub cors_origins: Vec<String>,
}

impl NodeConfig {
    /// Configuration for a node that starts active.
    pub fn active(self_addr: impl Into<String>, descendants: Vec<String>) -> Self {
        Self {
            role: Role::Active,
            self_addr: self_addr.into(),
            parent_addr: None,
            descendants,
            name: None,
            settings: EngineSettings::default(),
            bind_host: default_bind_host(),
            cors_origins: Vec::new(),
        }
    }

    /// Configuration for a standby watching `parent_addr`.
    pub fn standby(
        self_addr: impl Into<String>,
        parent_addr: impl Into<String>,
        descendants: Vec<String>,
    ) -> Self {
        Self {
            role: Role::Standby,
            parent_addr: Some(parent_addr.into()),
            ..Self::active(self_addr, descendants)
        }
    }

    /// Builder-style override of the engine settings.
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builder-style display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Load and validate configuration from a file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::unreadable(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let file: ConfigFile = serde_json::from_str(content)
            .map_err(|e| ConfigError::malformed(format!("invalid config JSON: {}", e)))?;
        Self::from_file(file)
    }

    fn from_file(file: ConfigFile) -> ConfigResult<Self> {
        let role = match file.role.as_deref() {
            None => return Err(ConfigError::missing_role()),
            Some(raw) => Role::parse(raw)?,
        };

        let self_addr = file
            .self_addr
            .filter(|addr| !addr.trim().is_empty())
            .ok_or_else(|| ConfigError::invalid_address("self_addr", ""))?;

        let parent_addr = file.parent_addr.filter(|addr| !addr.trim().is_empty());

        let config = Self {
            role,
            self_addr,
            parent_addr,
            descendants: file.slaves,
            name: file.name,
            settings: EngineSettings {
                monitor_interval: Duration::from_secs(file.monitor_interval_secs),
                peer_timeout: Duration::from_millis(file.peer_timeout_ms),
                promotion_stagger: Duration::from_secs(file.promotion_stagger_secs),
                temp_status_timeout: Duration::from_secs(file.temp_status_timeout_secs),
                pass_transport: file.pass_transport,
                reassert_descendants: file.reassert_descendants,
            },
            bind_host: file.bind_host,
            cors_origins: file.cors_origins,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// - Slave requires parent_addr
    /// - Master forbids parent_addr
    /// - Every address is `host:port`
    /// - Monitor interval and peer timeout are non-zero
    pub fn validate(&self) -> ConfigResult<()> {
        match (self.role, &self.parent_addr) {
            (Role::Standby, None) => return Err(ConfigError::missing_parent()),
            (Role::Active, Some(_)) => return Err(ConfigError::unexpected_parent()),
            _ => {}
        }

        split_host_port(&self.self_addr)
            .ok_or_else(|| ConfigError::invalid_address("self_addr", &self.self_addr))?;

        if let Some(parent) = &self.parent_addr {
            split_host_port(parent)
                .ok_or_else(|| ConfigError::invalid_address("parent_addr", parent))?;
            if parent == &self.self_addr {
                return Err(ConfigError::invalid_value(
                    "parent_addr must differ from self_addr",
                ));
            }
        }

        for addr in &self.descendants {
            split_host_port(addr).ok_or_else(|| ConfigError::invalid_address("slaves", addr))?;
        }

        if self.settings.monitor_interval.is_zero() {
            return Err(ConfigError::invalid_value("monitor_interval_secs must be > 0"));
        }
        if self.settings.peer_timeout.is_zero() {
            return Err(ConfigError::invalid_value("peer_timeout_ms must be > 0"));
        }

        Ok(())
    }

    /// Port this node listens on, taken from `self_addr`.
    pub fn port(&self) -> u16 {
        // validate() guarantees a parseable port; 0 only for unvalidated configs.
        split_host_port(&self.self_addr)
            .map(|(_, port)| port)
            .unwrap_or(0)
    }

    pub fn is_active_role(&self) -> bool {
        self.role == Role::Active
    }
}

/// Split `host:port`, rejecting empty hosts and non-numeric ports.
pub fn split_host_port(addr: &str) -> Option<(&str, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port = port.parse::<u16>().ok()?;
    Some((host, port))
}
