//! System status: service reachability from health probes plus host resources.

use crate::status::{HealthAggregator, HealthState, GATEWAY_SUBSYSTEM};
use crate::types::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use sysinfo::{Disks, Networks, System};

/// Service name the gateway is reported under.
pub const GATEWAY_SERVICE: &str = "mcp_gateway";

/// Service name of this process.
pub const BACKEND_SERVICE: &str = "backend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Online,
    Degraded,
    Offline,
    Unknown,
}

impl From<HealthState> for ServiceState {
    fn from(state: HealthState) -> Self {
        match state {
            HealthState::Healthy => Self::Online,
            HealthState::Degraded => Self::Degraded,
            HealthState::Unhealthy => Self::Offline,
            HealthState::Unknown => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub status: ServiceState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkStatus {
    Connected,
    Disconnected,
}

/// Host resource usage, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceUsage {
    pub cpu_usage: f32,
    pub memory_usage: f32,
    pub disk_usage: f32,
    pub network_status: NetworkStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemStatus {
    pub services: BTreeMap<String, ServiceStatus>,
    pub resources: ResourceUsage,
    pub last_updated: DateTime<Utc>,
}

/// Combines a health sweep with a host resource sample.
#[derive(Clone)]
pub struct SystemMonitor {
    aggregator: HealthAggregator,
    system: Arc<Mutex<System>>,
}

impl std::fmt::Debug for SystemMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemMonitor")
            .field("aggregator", &self.aggregator)
            .finish_non_exhaustive()
    }
}

impl SystemMonitor {
    pub fn new(aggregator: HealthAggregator) -> Self {
        // kept alive between samples so CPU usage has a baseline
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            aggregator,
            system: Arc::new(Mutex::new(system)),
        }
    }

    pub async fn status(&self) -> Result<SystemStatus> {
        let health = self.aggregator.refresh().await;

        let mut services = BTreeMap::new();
        services.insert(
            BACKEND_SERVICE.to_string(),
            ServiceStatus {
                status: ServiceState::Online,
                latency: None,
            },
        );
        for (id, check) in &health.checks {
            let name = if id == GATEWAY_SUBSYSTEM {
                GATEWAY_SERVICE
            } else {
                id.as_str()
            };
            services.insert(
                name.to_string(),
                ServiceStatus {
                    status: check.status.into(),
                    latency: check.latency_ms,
                },
            );
        }

        let system = self.system.clone();
        let resources = tokio::task::spawn_blocking(move || {
            let mut system = system.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            sample_resources(&mut system)
        })
        .await
        .map_err(|e| Error::internal(format!("resource sampling failed: {}", e)))?;

        Ok(SystemStatus {
            services,
            resources,
            last_updated: Utc::now(),
        })
    }
}

fn sample_resources(system: &mut System) -> ResourceUsage {
    system.refresh_cpu_usage();
    system.refresh_memory();

    let disks = Disks::new_with_refreshed_list();
    let (disk_total, disk_available) = disks.list().iter().fold((0u64, 0u64), |(t, a), d| {
        (t.saturating_add(d.total_space()), a.saturating_add(d.available_space()))
    });

    let networks = Networks::new_with_refreshed_list();
    let network_status = if networks.iter().any(|(name, _)| name != "lo") {
        NetworkStatus::Connected
    } else {
        NetworkStatus::Disconnected
    };

    ResourceUsage {
        cpu_usage: round1(system.global_cpu_usage()),
        memory_usage: percent(system.used_memory(), system.total_memory()),
        disk_usage: percent(disk_total.saturating_sub(disk_available), disk_total),
        network_status,
    }
}

fn percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    round1((used as f64 / total as f64 * 100.0) as f32)
}

fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}
