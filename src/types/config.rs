//! Configuration structures.
//!
//! Configuration is loaded from a TOML file and then overridden by environment
//! variables. Every section has defaults so an empty file is valid.

use crate::tools::Tool;
use crate::types::Error;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding `server.listen_addr`.
pub const ENV_LISTEN_ADDR: &str = "DESKPILOT_LISTEN_ADDR";
/// Environment variable overriding `gateway.base_url`.
pub const ENV_GATEWAY_URL: &str = "DESKPILOT_GATEWAY_URL";

/// Global service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, JsonSchema)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Tool gateway connection.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Tool invocation defaults.
    #[serde(default)]
    pub invoker: InvokerConfig,

    /// Health probing.
    #[serde(default)]
    pub health: HealthConfig,

    /// Static tool definitions. When empty the built-in catalog is loaded.
    #[serde(default)]
    pub tools: Vec<Tool>,
}

impl Config {
    /// Parse a TOML config file.
    pub fn from_file(path: &Path) -> crate::types::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> crate::types::Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("invalid config: {}", e)))
    }

    /// Load from an optional file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> crate::types::Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process env in production).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup(ENV_LISTEN_ADDR).filter(|v| !v.is_empty()) {
            self.server.listen_addr = addr;
        }
        if let Some(url) = lookup(ENV_GATEWAY_URL).filter(|v| !v.is_empty()) {
            self.gateway.base_url = url;
        }
    }

    /// JSON schema describing this configuration file.
    pub fn json_schema() -> serde_json::Value {
        let schema = schemars::schema_for!(Config);
        serde_json::to_value(schema).unwrap_or(serde_json::Value::Null)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ServerConfig {
    /// HTTP bind address.
    pub listen_addr: String,

    /// Allow cross-origin requests from any origin (browser UI on another port).
    pub permissive_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3001".to_string(),
            permissive_cors: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Tool gateway connection.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the gateway process brokering tool access.
    pub base_url: String,

    /// Timeout for status/restart calls.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub request_timeout: Duration,

    /// Delay before re-reading status after a restart command.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub restart_settle_delay: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8811".to_string(),
            request_timeout: Duration::from_secs(5),
            restart_settle_delay: Duration::from_secs(3),
        }
    }
}

/// Tool invocation defaults.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct InvokerConfig {
    /// Timeout applied when a request does not carry one.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub default_timeout: Duration,

    /// Maximum retained execution results.
    pub history_capacity: usize,
}

impl Default for InvokerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(60),
            history_capacity: crate::tools::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

/// Health probing configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct HealthConfig {
    /// Per-probe timeout.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub probe_timeout: Duration,

    /// Added to the probe timeout to form the overall refresh deadline.
    #[serde(with = "humantime_serde")]
    #[schemars(with = "String")]
    pub refresh_overhead: Duration,

    /// Named components probed alongside the tools (model endpoint, desktop
    /// backend, stream relay).
    pub components: Vec<ComponentEndpoint>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(5),
            refresh_overhead: Duration::from_millis(500),
            components: Vec::new(),
        }
    }
}

/// A component health endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ComponentEndpoint {
    /// Subsystem id, e.g. `gemini3`, `e2bDesktop`, `vncStream`.
    pub id: String,
    /// URL answering `GET` with `{status, ...}`.
    pub url: String,
}
