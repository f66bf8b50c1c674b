//! Health aggregation - many probes, one system-status signal.
//!
//! Escalation rules, in precedence order:
//!
//! 1. Gateway not healthy (probe failure included) → `down`; tools are not probed.
//! 2. Any other subsystem not healthy, or nothing besides the gateway was
//!    probed → `degraded`. Only the gateway can take the system down.
//! 3. Otherwise `healthy`.

use crate::control::SharedControl;
use crate::status::probe::{bounded, HealthProbe, HealthState, HealthStatus, ToolProbe, GATEWAY_SUBSYSTEM};
use crate::tools::{Tool, ToolStatus};
use crate::types::{Error, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Selection keyword that expands to a full refresh.
pub const ALL_COMPONENTS: &str = "all";

/// System-wide health signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Degraded,
    Down,
}

/// One aggregate snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateHealth {
    pub overall: OverallHealth,
    pub checks: BTreeMap<String, HealthStatus>,
    pub timestamp: DateTime<Utc>,
}

impl AggregateHealth {
    fn from_checks(gateway: Option<HealthStatus>, others: Vec<HealthStatus>) -> Self {
        let overall = reduce(gateway.as_ref(), &others);
        let checks = gateway
            .into_iter()
            .chain(others)
            .map(|s| (s.subsystem_id.clone(), s))
            .collect();
        Self {
            overall,
            checks,
            timestamp: Utc::now(),
        }
    }
}

/// Reduce probe outcomes to one overall status.
///
/// `gateway` is `None` when the gateway was not part of the selection.
pub fn reduce(gateway: Option<&HealthStatus>, others: &[HealthStatus]) -> OverallHealth {
    if gateway.is_some_and(|g| g.status != HealthState::Healthy) {
        return OverallHealth::Down;
    }
    let impaired = others.iter().any(|s| s.status != HealthState::Healthy);
    if impaired || others.is_empty() {
        return OverallHealth::Degraded;
    }
    OverallHealth::Healthy
}

/// Probes the gateway, the enabled tools and the named components.
#[derive(Clone)]
pub struct HealthAggregator {
    control: SharedControl,
    gateway: Arc<dyn HealthProbe>,
    tools: Arc<dyn ToolProbe>,
    components: Vec<Arc<dyn HealthProbe>>,
    probe_timeout: Duration,
    refresh_overhead: Duration,
}

impl std::fmt::Debug for HealthAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let components: Vec<&str> = self.components.iter().map(|c| c.subsystem_id()).collect();
        f.debug_struct("HealthAggregator")
            .field("components", &components)
            .field("probe_timeout", &self.probe_timeout)
            .field("refresh_overhead", &self.refresh_overhead)
            .finish_non_exhaustive()
    }
}

impl HealthAggregator {
    pub fn new(
        control: SharedControl,
        gateway: Arc<dyn HealthProbe>,
        tools: Arc<dyn ToolProbe>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            control,
            gateway,
            tools,
            components: Vec::new(),
            probe_timeout,
            refresh_overhead: Duration::from_millis(500),
        }
    }

    pub fn with_component(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.components.push(probe);
        self
    }

    pub fn with_refresh_overhead(mut self, overhead: Duration) -> Self {
        self.refresh_overhead = overhead;
        self
    }

    pub fn component_ids(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.subsystem_id()).collect()
    }

    /// Full sweep: gateway first, then every enabled tool and component.
    pub async fn refresh(&self) -> AggregateHealth {
        let gateway = self.probe_gateway().await;
        if !gateway.is_healthy() {
            tracing::warn!(
                status = gateway.status.as_str(),
                "gateway not healthy; skipping tool probes"
            );
            return AggregateHealth::from_checks(Some(gateway), Vec::new());
        }

        let tools = self.enabled_tools().await;
        let mut ids: Vec<String> = tools.iter().map(|t| t.id.clone()).collect();
        ids.extend(self.components.iter().map(|c| c.subsystem_id().to_string()));

        let tool_probes = tools.iter().map(|tool| self.probe_tool_bounded(tool));
        let component_probes = self.components.iter().map(|c| self.probe_component_bounded(c));

        let fan_out = async {
            let (mut tools_done, components_done) =
                futures::join!(join_all(tool_probes), join_all(component_probes));
            tools_done.extend(components_done);
            tools_done
        };

        let others = match tokio::time::timeout(self.refresh_deadline(), fan_out).await {
            Ok(results) => results,
            Err(_) => {
                tracing::warn!("health refresh deadline exceeded");
                ids.iter()
                    .map(|id| HealthStatus::unknown(id, "refresh deadline exceeded"))
                    .collect()
            }
        };

        self.record_tool_statuses(&tools, &others).await;
        let aggregate = AggregateHealth::from_checks(Some(gateway), others);
        tracing::info!(
            overall = ?aggregate.overall,
            subsystems = aggregate.checks.len(),
            "health refreshed"
        );
        aggregate
    }

    /// Probe a selection of subsystems by name. `"all"` means a full refresh.
    ///
    /// Names that are neither the gateway, a registered tool nor a component
    /// are reported as `unknown`.
    pub async fn check(&self, names: &[String]) -> AggregateHealth {
        if names.is_empty() || names.iter().any(|n| n == ALL_COMPONENTS) {
            return self.refresh().await;
        }

        let include_gateway = names.iter().any(|n| n == GATEWAY_SUBSYSTEM);
        let selected: Vec<&String> = {
            let mut seen = std::collections::HashSet::new();
            names
                .iter()
                .filter(|n| n.as_str() != GATEWAY_SUBSYSTEM && seen.insert(n.as_str()))
                .collect()
        };

        let gateway = async {
            if include_gateway {
                Some(self.probe_gateway().await)
            } else {
                None
            }
        };
        let others = join_all(selected.into_iter().map(|name| self.probe_named(name)));
        let (gateway, others) = futures::join!(gateway, others);

        AggregateHealth::from_checks(gateway, others)
    }

    /// Probe a single configured component.
    pub async fn check_component(&self, name: &str) -> Result<HealthStatus> {
        let probe = self
            .components
            .iter()
            .find(|c| c.subsystem_id() == name)
            .ok_or_else(|| Error::not_found(format!("component {}", name)))?;
        Ok(self.probe_component_bounded(probe).await)
    }

    /// Probe one tool by id and record the outcome in the registry.
    pub async fn probe_tool(&self, tool_id: &str) -> Result<HealthStatus> {
        let tool = self.control.lock().await.registry().get(tool_id)?.clone();
        let status = self.probe_tool_bounded(&tool).await;
        self.record_tool_statuses(std::slice::from_ref(&tool), std::slice::from_ref(&status))
            .await;
        Ok(status)
    }

    async fn probe_named(&self, name: &str) -> HealthStatus {
        if let Some(probe) = self.components.iter().find(|c| c.subsystem_id() == name) {
            return self.probe_component_bounded(probe).await;
        }
        match self.probe_tool(name).await {
            Ok(status) => status,
            Err(_) => HealthStatus::unknown(name, "unknown subsystem"),
        }
    }

    async fn probe_gateway(&self) -> HealthStatus {
        bounded(GATEWAY_SUBSYSTEM, self.probe_timeout, self.gateway.probe()).await
    }

    async fn probe_tool_bounded(&self, tool: &Tool) -> HealthStatus {
        bounded(&tool.id, self.probe_timeout, self.tools.probe_tool(tool)).await
    }

    async fn probe_component_bounded(&self, probe: &Arc<dyn HealthProbe>) -> HealthStatus {
        bounded(probe.subsystem_id(), self.probe_timeout, probe.probe()).await
    }

    async fn enabled_tools(&self) -> Vec<Tool> {
        let state = self.control.lock().await;
        state
            .registry()
            .list()
            .into_iter()
            .filter(|t| t.enabled)
            .cloned()
            .collect()
    }

    /// Healthy or degraded keeps a tool active; anything else marks it errored.
    async fn record_tool_statuses(&self, tools: &[Tool], results: &[HealthStatus]) {
        let mut state = self.control.lock().await;
        let registry = state.registry_mut();
        for result in results {
            if !tools.iter().any(|t| t.id == result.subsystem_id) {
                continue;
            }
            let status = match result.status {
                HealthState::Healthy | HealthState::Degraded => ToolStatus::Active,
                HealthState::Unhealthy | HealthState::Unknown => ToolStatus::Error,
            };
            if let Err(err) = registry.set_status(&result.subsystem_id, status) {
                tracing::debug!(error = %err, "tool vanished before status update");
            }
        }
    }

    fn refresh_deadline(&self) -> Duration {
        self.probe_timeout + self.refresh_overhead
    }
}
