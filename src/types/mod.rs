//! Core types for the control service.
//!
//! This module provides foundational types used throughout the system:
//! - **IDs**: Strongly-typed identifiers (ExecutionId, AgentId, SessionId)
//! - **Errors**: Application error types with thiserror derives
//! - **Config**: Configuration structures for server, gateway, invoker and health

mod config;
mod errors;
mod ids;

pub use config::{
    ComponentEndpoint, Config, GatewayConfig, HealthConfig, InvokerConfig, ObservabilityConfig,
    ServerConfig, ENV_GATEWAY_URL, ENV_LISTEN_ADDR,
};
pub use errors::{Error, Result};
pub use ids::{AgentId, ExecutionId, SessionId};
