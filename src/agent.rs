//! Agent run state behind the start/stop endpoints.
//!
//! Only one agent runs at a time. The controller tracks the run; the agent
//! process itself lives behind the model-streaming integration.

use crate::types::{AgentId, Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Mode used when the start request names none.
pub const DEFAULT_MODE: &str = "interactive";

/// Tool families enabled when the start request names none.
pub const DEFAULT_TOOLS: &[&str] = &["mcp", "e2b", "gemini"];

/// What a started agent is able to do.
pub const CAPABILITIES: &[&str] = &[
    "file_operations",
    "code_execution",
    "web_automation",
    "database_access",
    "api_integration",
];

/// A running agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRun {
    pub agent_id: AgentId,
    pub mode: String,
    pub tools: Vec<String>,
    pub capabilities: Vec<String>,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct AgentController {
    current: RwLock<Option<AgentRun>>,
}

impl AgentController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an agent. Fails if one is already running.
    pub async fn start(&self, mode: Option<String>, tools: Option<Vec<String>>) -> Result<AgentRun> {
        let mut current = self.current.write().await;
        if let Some(running) = current.as_ref() {
            return Err(Error::validation(format!(
                "agent {} is already running",
                running.agent_id
            )));
        }

        let run = AgentRun {
            agent_id: AgentId::new(),
            mode: mode
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODE.to_string()),
            tools: tools
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TOOLS.iter().map(|s| s.to_string()).collect()),
            capabilities: CAPABILITIES.iter().map(|s| s.to_string()).collect(),
            started_at: Utc::now(),
        };
        tracing::info!(agent_id = %run.agent_id, mode = %run.mode, "agent started");
        *current = Some(run.clone());
        Ok(run)
    }

    /// Stop the running agent, returning it. Stopping when idle is not an error.
    pub async fn stop(&self) -> Option<AgentRun> {
        let stopped = self.current.write().await.take();
        match &stopped {
            Some(run) => tracing::info!(agent_id = %run.agent_id, "agent stopped"),
            None => tracing::debug!("stop requested with no agent running"),
        }
        stopped
    }

    pub async fn current(&self) -> Option<AgentRun> {
        self.current.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_start_stop_lifecycle() {
        let controller = AgentController::new();
        assert!(controller.current().await.is_none());

        let run = assert_ok!(controller.start(None, None).await);
        assert!(run.agent_id.as_str().starts_with("agent_"));
        assert_eq!(run.mode, "interactive");
        assert_eq!(run.tools, vec!["mcp", "e2b", "gemini"]);
        assert_eq!(controller.current().await, Some(run.clone()));

        assert_eq!(controller.stop().await, Some(run));
        assert!(controller.current().await.is_none());
        assert!(controller.stop().await.is_none());
    }

    #[tokio::test]
    async fn test_second_start_rejected() {
        let controller = AgentController::new();
        controller
            .start(Some("autonomous".into()), Some(vec!["mcp".into()]))
            .await
            .unwrap();
        let err = controller.start(None, None).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        controller.stop().await;
        assert_ok!(controller.start(None, None).await);
    }

    #[tokio::test]
    async fn test_wire_shape() {
        let controller = AgentController::new();
        let run = controller.start(Some("  ".into()), Some(Vec::new())).await.unwrap();
        let value = serde_json::to_value(&run).unwrap();
        assert_eq!(value["mode"], "interactive");
        assert_eq!(value["capabilities"].as_array().unwrap().len(), 5);
        assert!(value["agentId"].as_str().is_some());
    }
}
