//! Desktop actions dispatched through the tool invoker.
//!
//! Actions: `init_desktop`, `click`, `type`, `press`, `launch`, `screenshot`,
//! `close_desktop`. Every action needs a session id; only `init_desktop`
//! may create a sandbox.

use crate::desktop::sandbox::SessionManager;
use crate::tools::{ToolCall, ToolHandler};
use crate::types::{Error, Result, SessionId};
use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Routes desktop tool calls to the session's sandbox.
#[derive(Debug, Clone)]
pub struct ComputerActionHandler {
    sessions: Arc<SessionManager>,
}

impl ComputerActionHandler {
    pub fn new(sessions: Arc<SessionManager>) -> Self {
        Self { sessions }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    async fn init_desktop(&self, session: &SessionId) -> Result<Value> {
        let (sandbox, _) = self.sessions.get_or_create(session).await?;
        Ok(json!({
            "vncUrl": sandbox.stream_url().await?,
            "sandboxId": sandbox.sandbox_id(),
            "sessionId": session,
        }))
    }
}

fn int_param(params: &Map<String, Value>, name: &str) -> Result<i64> {
    params
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::validation(format!("{} is required", name)))
}

fn text_param<'a>(params: &'a Map<String, Value>, action: &str) -> Result<&'a str> {
    params
        .get("text")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::validation(format!("text is required for {}", action)))
}

#[async_trait]
impl ToolHandler for ComputerActionHandler {
    async fn call(&self, call: ToolCall) -> Result<Value> {
        let session = call
            .session_id
            .as_ref()
            .ok_or_else(|| Error::validation("sessionId is required for desktop actions"))?;

        match call.action.as_str() {
            "init_desktop" => return self.init_desktop(session).await,
            "close_desktop" => {
                let closed = self.sessions.close(session).await?;
                return Ok(json!({ "closed": closed }));
            }
            _ => {}
        }

        let sandbox = self.sessions.get(session).await?;
        let params = &call.parameters;
        match call.action.as_str() {
            "click" => {
                sandbox
                    .click(int_param(params, "x")?, int_param(params, "y")?)
                    .await?
            }
            "type" => sandbox.type_text(text_param(params, "type")?).await?,
            "press" => sandbox.press(text_param(params, "press")?).await?,
            "launch" => sandbox.launch(text_param(params, "launch")?).await?,
            "screenshot" => {
                let png = sandbox.screenshot().await?;
                return Ok(json!({
                    "format": "png",
                    "image": base64::engine::general_purpose::STANDARD.encode(&png),
                }));
            }
            other => {
                return Err(Error::validation(format!("unsupported desktop action: {}", other)))
            }
        }
        tracing::debug!(session_id = %session, action = %call.action, "desktop action applied");
        Ok(json!({ "success": true }))
    }
}
