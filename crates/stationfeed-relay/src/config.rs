//! Relay configuration

use crate::cli::Cli;
use crate::upstream::{Backoff, UpstreamEndpoint};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Upstream feed subscription
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// WebSocket viewer endpoint
    #[serde(default)]
    pub viewer: ListenConfig,

    /// Static status page endpoint
    #[serde(default)]
    pub status_page: StatusPageConfig,
}

impl RelayConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        // Apply CLI overrides
        if let Some(upstream) = &cli.upstream {
            config.upstream.endpoint = upstream.clone();
        }

        if let Some(listen) = &cli.listen {
            config.viewer.address = listen.clone();
            config.status_page.address = listen.clone();
        }

        if let Some(port) = cli.viewer_port {
            config.viewer.port = port;
        }

        if let Some(port) = cli.page_port {
            config.status_page.port = port;
        }

        if cli.no_status_page {
            config.status_page.enabled = false;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the relay cannot start with
    pub fn validate(&self) -> stationfeed_core::Result<()> {
        UpstreamEndpoint::parse(&self.upstream.endpoint)?;
        self.upstream.reconnect.validate()?;
        self.viewer.socket_addr()?;
        if self.viewer.queue_capacity == 0 {
            return Err(stationfeed_core::Error::config(
                "viewer queue_capacity must be greater than zero",
            ));
        }
        if self.status_page.enabled {
            self.status_page.socket_addr()?;
        }
        Ok(())
    }
}

/// Upstream feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Publisher endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Reconnect policy after a lost or refused connection
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Exponential reconnect settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upstream silence after which the connection is considered lost
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl ReconnectConfig {
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.multiplier,
        )
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    fn validate(&self) -> stationfeed_core::Result<()> {
        if self.idle_timeout_ms == 0 {
            return Err(stationfeed_core::Error::config(
                "reconnect idle_timeout_ms must be greater than zero",
            ));
        }
        if self.multiplier.is_nan() || self.multiplier < 1.0 {
            return Err(stationfeed_core::Error::config(format!(
                "reconnect multiplier must be at least 1.0, got {}",
                self.multiplier
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(stationfeed_core::Error::config(format!(
                "reconnect initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

/// Listener address and port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_viewer_port")]
    pub port: u16,

    /// Frames buffered per viewer before it is dropped as too slow
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl ListenConfig {
    pub fn socket_addr(&self) -> stationfeed_core::Result<SocketAddr> {
        parse_socket_addr(&self.address, self.port)
    }
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_viewer_port(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Status page configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusPageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_page_port")]
    pub port: u16,
}

impl StatusPageConfig {
    pub fn socket_addr(&self) -> stationfeed_core::Result<SocketAddr> {
        parse_socket_addr(&self.address, self.port)
    }
}

impl Default for StatusPageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            address: default_address(),
            port: default_page_port(),
        }
    }
}

fn parse_socket_addr(address: &str, port: u16) -> stationfeed_core::Result<SocketAddr> {
    format!("{}:{}", address, port)
        .parse()
        .map_err(|e| stationfeed_core::Error::config(format!("invalid listen address '{}': {}", address, e)))
}

fn default_endpoint() -> String {
    "tcp://localhost:5556".to_string()
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_idle_timeout_ms() -> u64 {
    5_000
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_viewer_port() -> u16 {
    8080
}

fn default_queue_capacity() -> usize {
    32
}

fn default_page_port() -> u16 {
    3000
}

fn default_true() -> bool {
    true
}
