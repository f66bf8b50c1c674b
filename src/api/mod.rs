//! HTTP API - JSON endpoints consumed by the browser control surface.
//!
//! Handlers are thin: they parse the request, call one component and shape
//! the response. Every failure is answered with an `{"error": ...}` body.

pub mod handlers;
pub mod router;
pub mod server;

pub use router::{build_router, ApiError};
pub use server::ApiServer;

use crate::agent::AgentController;
use crate::control::ControlState;
use crate::status::{
    GatewayProbe, GatewayStatusTracker, HealthAggregator, HttpComponentProbe, HttpGatewayClient,
    HttpToolProbe,
};
use crate::system::SystemMonitor;
use crate::tools::{GatewayToolHandler, HandlerSet, ToolInvoker};
use crate::types::{Config, Result};
use std::sync::Arc;
use std::time::Instant;

/// Everything the handlers need. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    pub invoker: ToolInvoker,
    pub gateway: GatewayStatusTracker,
    pub health: HealthAggregator,
    pub agent: Arc<AgentController>,
    pub system: SystemMonitor,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        invoker: ToolInvoker,
        gateway: GatewayStatusTracker,
        health: HealthAggregator,
    ) -> Self {
        Self {
            system: SystemMonitor::new(health.clone()),
            invoker,
            gateway,
            health,
            agent: Arc::new(AgentController::new()),
            started_at: Instant::now(),
        }
    }

    /// Wire every component against the configured gateway.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_handlers(config, HandlerSet::new())
    }

    /// Like [`AppState::from_config`], with extra per-tool handlers (the
    /// desktop action handler, for one). Tools without a binding are relayed
    /// to the gateway unless `handlers` already carries a fallback.
    pub fn with_handlers(config: &Config, handlers: HandlerSet) -> Result<Self> {
        let control = ControlState::from_definitions(
            config.tools.clone(),
            config.invoker.history_capacity,
        )?
        .shared();

        let gateway_url = config.gateway.base_url.as_str();
        let gateway_http = reqwest::Client::builder()
            .timeout(config.gateway.request_timeout)
            .build()?;
        let probe_http = reqwest::Client::builder()
            .timeout(config.health.probe_timeout)
            .build()?;
        // tool calls are bounded by the invoker, not by the client
        let tool_http = reqwest::Client::builder().build()?;

        let handlers = if handlers.has_fallback() {
            handlers
        } else {
            handlers.fallback(Arc::new(GatewayToolHandler::with_client(tool_http, gateway_url)))
        };
        let invoker = ToolInvoker::new(control.clone(), handlers)
            .with_default_timeout(config.invoker.default_timeout);

        let gateway = GatewayStatusTracker::new(
            Arc::new(HttpGatewayClient::with_client(gateway_http, gateway_url)),
            config.gateway.restart_settle_delay,
        );

        let mut health = HealthAggregator::new(
            control,
            Arc::new(GatewayProbe::new(gateway.clone())),
            Arc::new(HttpToolProbe::new(probe_http.clone(), gateway_url)),
            config.health.probe_timeout,
        )
        .with_refresh_overhead(config.health.refresh_overhead);
        for component in &config.health.components {
            health = health.with_component(Arc::new(HttpComponentProbe::new(
                probe_http.clone(),
                &component.id,
                &component.url,
            )));
        }

        Ok(Self::new(invoker, gateway, health))
    }
}
