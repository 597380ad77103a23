//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the client.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the upstream client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Seed the registry with the built-in provider catalogue.
    pub include_builtin_providers: bool,

    /// Primary provider used when a caller passes an endpoint path and names none.
    pub default_provider: Option<String>,

    /// User-Agent sent on every outbound request.
    pub user_agent: String,

    /// Honour HTTP(S)_PROXY environment variables.
    pub use_system_proxy: bool,

    /// Circuit breaker thresholds, shared by all providers.
    pub breaker: BreakerConfig,

    /// Settings for pass-through requests to unregistered URLs.
    pub direct: DirectConfig,

    /// Additional (or overriding) provider definitions.
    pub providers: Vec<ProviderConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            include_builtin_providers: true,
            default_provider: Some("deribit".to_string()),
            user_agent: format!("upstream-client/{}", env!("CARGO_PKG_VERSION")),
            use_system_proxy: true,
            breaker: BreakerConfig::default(),
            direct: DirectConfig::default(),
            providers: Vec::new(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Upstream provider definition.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProviderConfig {
    /// Unique provider identifier.
    pub name: String,

    /// Base URL prefixed to every endpoint (e.g., "https://api.binance.com").
    pub base_url: String,

    /// Per-attempt request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Attempts per request against this provider (at least 1).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Maximum backoff delay in milliseconds.
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Random jitter factor in [0, 1).
    #[serde(default = "default_jitter")]
    pub jitter: f64,

    /// Static headers sent with every request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Optional fixed request rate.
    #[serde(default)]
    pub rate_limit_per_second: Option<f64>,
}

impl ProviderConfig {
    /// A provider with default policy for the given base URL.
    pub fn new(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            jitter: default_jitter(),
            headers: BTreeMap::new(),
            rate_limit_per_second: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_cap_ms() -> u64 {
    30_000
}

fn default_jitter() -> f64 {
    0.1
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Seconds an open circuit waits before admitting a probe.
    pub recovery_timeout_secs: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            recovery_timeout_secs: 60,
        }
    }
}

/// Pass-through (unregistered URL) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DirectConfig {
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self { timeout_ms: 30_000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
