//! Tool handlers - the seam where an invocation leaves the core.
//!
//! Real tool work happens behind the gateway (or the desktop SDK); handlers
//! only relay a validated call and hand back the payload.

use crate::types::{Error, Result, SessionId};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A validated call ready for a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool_id: String,
    pub action: String,
    pub parameters: Map<String, Value>,
    pub session_id: Option<SessionId>,
}

/// Executes one action for a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, call: ToolCall) -> Result<Value>;
}

/// Handler lookup: explicit per-tool bindings first, then the fallback.
#[derive(Default, Clone)]
pub struct HandlerSet {
    by_tool: HashMap<String, Arc<dyn ToolHandler>>,
    fallback: Option<Arc<dyn ToolHandler>>,
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<&String> = self.by_tool.keys().collect();
        bound.sort();
        f.debug_struct("HandlerSet")
            .field("bound", &bound)
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, tool_id: &str, handler: Arc<dyn ToolHandler>) -> Self {
        self.by_tool.insert(tool_id.to_string(), handler);
        self
    }

    pub fn fallback(mut self, handler: Arc<dyn ToolHandler>) -> Self {
        self.fallback = Some(handler);
        self
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn resolve(&self, tool_id: &str) -> Option<Arc<dyn ToolHandler>> {
        self.by_tool
            .get(tool_id)
            .cloned()
            .or_else(|| self.fallback.clone())
    }
}

// =============================================================================
// Gateway-backed handler
// =============================================================================

/// Relays calls to `POST {gateway}/tools/{id}/execute`.
#[derive(Debug, Clone)]
pub struct GatewayToolHandler {
    client: reqwest::Client,
    base_url: String,
}

impl GatewayToolHandler {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Share an existing client (connection pool) with other collaborators.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ToolHandler for GatewayToolHandler {
    async fn call(&self, call: ToolCall) -> Result<Value> {
        let url = format!("{}/tools/{}/execute", self.base_url, call.tool_id);
        let body = json!({
            "action": call.action,
            "parameters": call.parameters,
            "sessionId": call.session_id,
        });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            let message = payload
                .get("error")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| format!("gateway returned {}", status));
            return Err(Error::external(message));
        }
        if let Some(error) = payload.get("error").and_then(|v| v.as_str()) {
            if payload.get("success").and_then(|v| v.as_bool()) == Some(false) {
                return Err(Error::external(error));
            }
        }

        Ok(payload.get("data").cloned().unwrap_or(payload))
    }
}

/// Handler that answers after a fixed delay; used for local demos and tests.
#[derive(Debug, Clone)]
pub struct EchoHandler {
    pub delay: Duration,
}

#[async_trait]
impl ToolHandler for EchoHandler {
    async fn call(&self, call: ToolCall) -> Result<Value> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(json!({
            "toolId": call.tool_id,
            "action": call.action,
            "parameters": call.parameters,
        }))
    }
}
