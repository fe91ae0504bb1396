//! Configuration types for dnssd-topology.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::TopologyError;

/// Environment variable prefix for overrides, e.g.
/// `DNSSD_TOPOLOGY__DISCOVERY__DOMAIN=example.com.`.
pub const ENV_PREFIX: &str = "DNSSD_TOPOLOGY";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Discovery configuration.
    pub discovery: DiscoveryConfig,

    /// Telemetry configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Load configuration from an optional TOML file plus environment
    /// overrides. `domain`, when given, wins over both.
    pub fn load(path: Option<&Path>, domain: Option<&str>) -> Result<Self, TopologyError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("discovery.nameservers"),
            )
            .set_override_option("discovery.domain", domain.map(str::to_string))
            .and_then(|b| b.build())
            .and_then(|c| c.try_deserialize())
            .map_err(|e| TopologyError::Config(e.to_string()))?;

        config.discovery.validate()?;
        Ok(config)
    }
}

/// How and where to walk the DNS-SD namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Browse domain (e.g., "example.com."). A missing trailing dot is added.
    pub domain: String,

    /// Nameservers to query. Empty means the system resolver configuration.
    #[serde(default)]
    pub nameservers: Vec<SocketAddr>,

    /// Per-query timeout in milliseconds.
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Attempts per query before reporting a transport failure.
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Upper bound on queries in flight during one traversal.
    #[serde(default = "default_max_concurrent_queries")]
    pub max_concurrent_queries: usize,

    /// Deadline for a whole traversal in milliseconds.
    #[serde(default = "default_traversal_timeout_ms")]
    pub traversal_timeout_ms: u64,
}

impl DiscoveryConfig {
    /// Discovery settings for `domain` with every other field defaulted.
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            nameservers: Vec::new(),
            query_timeout_ms: default_query_timeout_ms(),
            attempts: default_attempts(),
            max_concurrent_queries: default_max_concurrent_queries(),
            traversal_timeout_ms: default_traversal_timeout_ms(),
        }
    }

    /// Reject settings the traversal cannot run with.
    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.domain.trim().trim_end_matches('.').is_empty() {
            return Err(TopologyError::Config("discovery.domain is empty".into()));
        }
        if self.max_concurrent_queries == 0 {
            return Err(TopologyError::Config(
                "discovery.max_concurrent_queries must be at least 1".into(),
            ));
        }
        if self.attempts == 0 {
            return Err(TopologyError::Config(
                "discovery.attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Per-query timeout.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// Whole-traversal deadline.
    pub fn traversal_timeout(&self) -> Duration {
        Duration::from_millis(self.traversal_timeout_ms)
    }
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log level filter (e.g., "info", "debug", "dnssd_topology=debug,warn").
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Prometheus metrics exporter address.
    #[serde(default)]
    pub prometheus_addr: Option<SocketAddr>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            prometheus_addr: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_query_timeout_ms() -> u64 {
    2000
}

fn default_attempts() -> usize {
    2
}

fn default_max_concurrent_queries() -> usize {
    16
}

fn default_traversal_timeout_ms() -> u64 {
    30_000
}
