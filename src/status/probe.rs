//! Health probes - one subsystem each.
//!
//! A probe answers with a [`HealthStatus`] or an error; the aggregator turns
//! errors and timeouts into `unknown`.

use crate::status::gateway::GatewayStatusTracker;
use crate::tools::Tool;
use crate::types::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;

/// Subsystem id of the gateway in aggregate checks.
pub const GATEWAY_SUBSYSTEM: &str = "gateway";

/// Health of a single subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
    Unknown,
}

impl HealthState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
            Self::Unknown => "unknown",
        }
    }
}

/// Map a status string reported by a subsystem onto a [`HealthState`].
pub fn classify(reported: &str) -> HealthState {
    match reported.trim().to_ascii_lowercase().as_str() {
        "healthy" | "ok" | "online" | "active" => HealthState::Healthy,
        "degraded" | "warning" => HealthState::Degraded,
        "unhealthy" | "down" | "offline" | "error" => HealthState::Unhealthy,
        _ => HealthState::Unknown,
    }
}

/// Result of probing one subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub subsystem_id: String,
    pub status: HealthState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub last_check: DateTime<Utc>,
}

impl HealthStatus {
    pub fn new(subsystem_id: &str, status: HealthState) -> Self {
        Self {
            subsystem_id: subsystem_id.to_string(),
            status,
            response_code: None,
            error_message: None,
            latency_ms: None,
            details: None,
            last_check: Utc::now(),
        }
    }

    pub fn unknown(subsystem_id: &str, message: impl Into<String>) -> Self {
        Self::new(subsystem_id, HealthState::Unknown).with_error(message)
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthState::Healthy
    }
}

/// Probes one named subsystem.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn subsystem_id(&self) -> &str;
    async fn probe(&self) -> Result<HealthStatus>;
}

/// Probes a registered tool's health endpoint.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolProbe: Send + Sync {
    async fn probe_tool(&self, tool: &Tool) -> Result<HealthStatus>;
}

// =============================================================================
// HTTP probes
// =============================================================================

/// `GET` a health URL and classify the answer.
///
/// A JSON body with a `status` string is classified; otherwise the HTTP code
/// decides (2xx healthy, anything else unhealthy).
async fn http_probe(client: &reqwest::Client, subsystem_id: &str, url: &str) -> Result<HealthStatus> {
    let started = Instant::now();
    let response = client.get(url).send().await?;
    let code = response.status();
    let body: Option<Value> = response.json().await.ok();
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let reported = body
        .as_ref()
        .and_then(|b| b.get("status"))
        .and_then(Value::as_str);
    let state = match reported {
        Some(s) => classify(s),
        None if code.is_success() => HealthState::Healthy,
        None => HealthState::Unhealthy,
    };

    let mut status = HealthStatus::new(subsystem_id, state).with_latency(latency_ms);
    status.response_code = Some(code.as_u16());
    if let Some(body) = body {
        if let Some(error) = body.get("error").and_then(Value::as_str) {
            status.error_message = Some(error.to_string());
        }
        status.details = Some(body);
    }
    Ok(status)
}

/// Probe for a named component (model endpoint, desktop backend, stream relay).
#[derive(Debug, Clone)]
pub struct HttpComponentProbe {
    client: reqwest::Client,
    id: String,
    url: String,
}

impl HttpComponentProbe {
    pub fn new(client: reqwest::Client, id: &str, url: &str) -> Self {
        Self {
            client,
            id: id.to_string(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl HealthProbe for HttpComponentProbe {
    fn subsystem_id(&self) -> &str {
        &self.id
    }

    async fn probe(&self) -> Result<HealthStatus> {
        http_probe(&self.client, &self.id, &self.url).await
    }
}

/// Probes tools at their configured `healthUrl`, else `{gateway}/tools/{id}/health`.
#[derive(Debug, Clone)]
pub struct HttpToolProbe {
    client: reqwest::Client,
    gateway_url: String,
}

impl HttpToolProbe {
    pub fn new(client: reqwest::Client, gateway_url: &str) -> Self {
        Self {
            client,
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, tool: &Tool) -> String {
        match tool.health_url() {
            Some(url) => url.to_string(),
            None => format!("{}/tools/{}/health", self.gateway_url, tool.id),
        }
    }
}

#[async_trait]
impl ToolProbe for HttpToolProbe {
    async fn probe_tool(&self, tool: &Tool) -> Result<HealthStatus> {
        http_probe(&self.client, &tool.id, &self.url_for(tool)).await
    }
}

/// The gateway as a probed subsystem: online is healthy, anything else unhealthy.
#[derive(Debug, Clone)]
pub struct GatewayProbe {
    tracker: GatewayStatusTracker,
}

impl GatewayProbe {
    pub fn new(tracker: GatewayStatusTracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl HealthProbe for GatewayProbe {
    fn subsystem_id(&self) -> &str {
        GATEWAY_SUBSYSTEM
    }

    async fn probe(&self) -> Result<HealthStatus> {
        let started = Instant::now();
        let status = self.tracker.status().await?;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let state = if status.is_online() {
            HealthState::Healthy
        } else {
            HealthState::Unhealthy
        };
        Ok(HealthStatus::new(GATEWAY_SUBSYSTEM, state)
            .with_latency(latency_ms)
            .with_details(serde_json::to_value(&status)?))
    }
}

/// Run a probe future under a deadline, folding failure into `unknown`.
pub async fn bounded<F>(subsystem_id: &str, deadline: Duration, probe: F) -> HealthStatus
where
    F: std::future::Future<Output = Result<HealthStatus>>,
{
    match tokio::time::timeout(deadline, probe).await {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => {
            tracing::debug!(subsystem = subsystem_id, error = %err, "probe failed");
            HealthStatus::unknown(subsystem_id, err.to_string())
        }
        Err(_) => {
            tracing::debug!(subsystem = subsystem_id, "probe timed out");
            HealthStatus::unknown(
                subsystem_id,
                Error::timeout(format!("probe exceeded {}ms", deadline.as_millis())).to_string(),
            )
        }
    }
}
