//! Gateway status tracking and restart relay.
//!
//! The gateway is the external process brokering tool access. This module
//! never assumes a command worked: a restart is relayed, then the status is
//! re-read after a settle delay.

use crate::types::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Gateway reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayState {
    Online,
    #[default]
    Offline,
}

/// Aggregate gateway status as reported by the gateway.
///
/// Snake-case aliases accept the gateway's own field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GatewayStatus {
    pub status: GatewayState,
    #[serde(default)]
    pub version: String,
    #[serde(default, alias = "uptime_secs")]
    pub uptime_secs: u64,
    #[serde(default, alias = "active_connections")]
    pub connections: u32,
    #[serde(default, alias = "last_heartbeat", skip_serializing_if = "Option::is_none")]
    pub last_heartbeat: Option<DateTime<Utc>>,
    #[serde(default, alias = "connected_tools", skip_serializing_if = "Option::is_none")]
    pub connected_tools: Option<usize>,
    #[serde(default, alias = "total_tools", skip_serializing_if = "Option::is_none")]
    pub total_tools: Option<usize>,
}

impl GatewayStatus {
    pub fn is_online(&self) -> bool {
        self.status == GatewayState::Online
    }

    /// Offline snapshot that keeps what was last known about the gateway.
    fn offline_from(previous: Option<&GatewayStatus>) -> Self {
        Self {
            status: GatewayState::Offline,
            version: previous.map(|p| p.version.clone()).unwrap_or_default(),
            last_heartbeat: previous.and_then(|p| p.last_heartbeat),
            total_tools: previous.and_then(|p| p.total_tools),
            ..Self::default()
        }
    }
}

/// Talks to the gateway process.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn fetch_status(&self) -> Result<GatewayStatus>;
    async fn restart(&self) -> Result<()>;
}

/// `GET {base}/status` and `POST {base}/restart`.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGatewayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl GatewayClient for HttpGatewayClient {
    async fn fetch_status(&self) -> Result<GatewayStatus> {
        let response = self
            .client
            .get(format!("{}/status", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::external(format!(
                "gateway status returned {}",
                response.status()
            )));
        }
        Ok(response.json::<GatewayStatus>().await?)
    }

    async fn restart(&self) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/restart", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::external(format!(
                "gateway restart returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Caches the last gateway status and relays restarts.
#[derive(Clone)]
pub struct GatewayStatusTracker {
    client: Arc<dyn GatewayClient>,
    last: Arc<RwLock<Option<GatewayStatus>>>,
    settle_delay: Duration,
}

impl std::fmt::Debug for GatewayStatusTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayStatusTracker")
            .field("settle_delay", &self.settle_delay)
            .finish_non_exhaustive()
    }
}

impl GatewayStatusTracker {
    pub fn new(client: Arc<dyn GatewayClient>, settle_delay: Duration) -> Self {
        Self {
            client,
            last: Arc::new(RwLock::new(None)),
            settle_delay,
        }
    }

    /// Fetch and cache the current status.
    ///
    /// A failed fetch caches an offline snapshot and returns the error.
    pub async fn status(&self) -> Result<GatewayStatus> {
        match self.client.fetch_status().await {
            Ok(status) => {
                *self.last.write().await = Some(status.clone());
                Ok(status)
            }
            Err(err) => {
                let mut last = self.last.write().await;
                let offline = GatewayStatus::offline_from(last.as_ref());
                *last = Some(offline);
                tracing::warn!(error = %err, "gateway status fetch failed");
                Err(err)
            }
        }
    }

    /// Last cached status, if any fetch has happened.
    pub async fn last_known(&self) -> Option<GatewayStatus> {
        self.last.read().await.clone()
    }

    /// Relay a restart, then re-read status once the gateway has had time to settle.
    pub async fn restart(&self) -> Result<()> {
        self.client.restart().await?;
        tracing::info!(settle_ms = settle_ms(self.settle_delay), "gateway restart requested");

        let tracker = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(tracker.settle_delay).await;
            match tracker.status().await {
                Ok(status) => tracing::info!(online = status.is_online(), "gateway status after restart"),
                Err(err) => tracing::warn!(error = %err, "gateway unreachable after restart"),
            }
        });
        Ok(())
    }
}

fn settle_ms(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
