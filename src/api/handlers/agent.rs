//! Agent start/stop endpoints.

use crate::api::router::{object_body, ApiResult};
use crate::api::AppState;
use crate::types::Error;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
struct StartBody {
    mode: Option<String>,
    tools: Option<Vec<String>>,
}

/// The body is optional; an empty one starts with defaults.
pub async fn start(State(state): State<AppState>, raw: Bytes) -> ApiResult<Json<Value>> {
    let body = if raw.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(&raw)
            .map_err(|e| Error::validation(format!("invalid JSON body: {}", e)))?
    };
    let body = object_body(body)?;
    let StartBody { mode, tools } = serde_json::from_value(Value::Object(body))
        .map_err(|e| Error::validation(format!("invalid start request: {}", e)))?;

    let run = state.agent.start(mode, tools).await?;
    Ok(Json(json!({
        "success": true,
        "agentId": run.agent_id,
        "message": "Agent started successfully",
        "config": run,
        "timestamp": Utc::now(),
    })))
}

pub async fn stop(State(state): State<AppState>) -> Json<Value> {
    let message = match state.agent.stop().await {
        Some(_) => "Agent stopped successfully",
        None => "No agent was running",
    };
    Json(json!({
        "success": true,
        "message": message,
        "timestamp": Utc::now(),
    }))
}
