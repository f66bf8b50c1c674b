//! Tool endpoints under `/api/mcp`.

use crate::api::router::{object_body, ApiError, ApiResult};
use crate::api::AppState;
use crate::tools::{ExecutionRequest, ExecutionStatus, UsageStatsCollector};
use crate::types::{Error, Result, SessionId};
use crate::validation::{optional_object, optional_str, require_str};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Action used when the request names none.
const DEFAULT_ACTION: &str = "execute";

pub async fn list_tools(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let control = state.invoker.control().lock().await;
    let registry = control.registry();
    let tools = serde_json::to_value(registry.list()).map_err(Error::from)?;
    Ok(Json(json!({
        "tools": tools,
        "total": registry.len(),
        "enabled": registry.enabled_count(),
    })))
}

pub async fn tool_health(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let status = state.health.probe_tool(&id).await?;
    Ok(Json(serde_json::to_value(status).map_err(Error::from)?))
}

pub async fn gateway_status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = state
        .gateway
        .status()
        .await
        .map_err(|e| ApiError::with_status(e, StatusCode::INTERNAL_SERVER_ERROR))?;
    Ok(Json(serde_json::to_value(status).map_err(Error::from)?))
}

pub async fn restart_gateway(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state
        .gateway
        .restart()
        .await
        .map_err(|e| ApiError::with_status(e, StatusCode::INTERNAL_SERVER_ERROR))?;
    Ok(Json(json!({
        "success": true,
        "message": "Restart requested; status will refresh once the gateway settles",
        "timestamp": Utc::now(),
    })))
}

/// Turn an execute body into a request.
///
/// The action comes from `action`, else `parameters.action` (which is then
/// removed from the parameters), else `"execute"`. `config.timeout` is in
/// milliseconds.
fn parse_execute(body: Map<String, Value>) -> Result<ExecutionRequest> {
    let tool_id = require_str(&body, "toolId")?.to_string();
    let mut parameters = optional_object(&body, "parameters")?;

    let action = match optional_str(&body, "action")? {
        Some(action) => action.to_string(),
        None => match parameters.remove("action") {
            Some(Value::String(action)) => action,
            Some(_) => return Err(Error::validation("parameters.action must be a string")),
            None => DEFAULT_ACTION.to_string(),
        },
    };

    let config = optional_object(&body, "config")?;
    let mut request = ExecutionRequest::new(tool_id, action).with_parameters(parameters);

    match config.get("timeout") {
        None | Some(Value::Null) => {}
        Some(value) => {
            let ms = value
                .as_u64()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| Error::validation("config.timeout must be a positive number of milliseconds"))?;
            request = request.with_timeout(Duration::from_millis(ms));
        }
    }
    if let Some(session) = optional_str(&config, "sessionId")? {
        let session = SessionId::from_string(session.to_string()).map_err(Error::validation)?;
        request = request.with_session(session);
    }
    Ok(request)
}

pub async fn execute(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let request = parse_execute(object_body(body)?)?;
    let result = state.invoker.execute(request).await;

    let mut response = json!({
        "executionId": result.execution_id,
        "toolId": result.tool_id,
        "action": result.action,
        "status": if result.success { "completed" } else { "error" },
        "result": result.data,
        "timestamp": result.timestamp,
        "duration": result.execution_time_ms,
    });
    if let Some(error) = &result.error {
        response["error"] = json!(error);
    }
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionQuery {
    execution_id: Option<String>,
}

pub async fn execution_status(
    State(state): State<AppState>,
    Query(query): Query<ExecutionQuery>,
) -> ApiResult<Json<Value>> {
    let execution_id = query
        .execution_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::validation("executionId is required"))?;

    let status = state
        .invoker
        .status(&execution_id)
        .await
        .ok_or_else(|| Error::not_found(format!("execution {}", execution_id)))?;

    let body = match status {
        ExecutionStatus::Running {
            tool_id,
            action,
            started_at,
            elapsed_ms,
        } => json!({
            "executionId": execution_id,
            "toolId": tool_id,
            "action": action,
            "status": "running",
            "result": Value::Null,
            "progress": 0,
            "startedAt": started_at,
            "elapsedMs": elapsed_ms,
        }),
        ExecutionStatus::Finished(result) => {
            let mut body = json!({
                "executionId": execution_id,
                "toolId": result.tool_id,
                "action": result.action,
                "status": if result.success { "completed" } else { "error" },
                "result": result.data,
                "progress": 100,
                "timestamp": result.timestamp,
                "duration": result.execution_time_ms,
            });
            if let Some(error) = result.error {
                body["error"] = json!(error);
            }
            body
        }
    };
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    tool_id: Option<String>,
}

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Value>> {
    let control = state.invoker.control().lock().await;
    let executions = match query.tool_id.as_deref().filter(|id| !id.is_empty()) {
        Some(tool_id) => control.history().by_tool(tool_id),
        None => control.history().snapshot(),
    };
    Ok(Json(json!({
        "total": executions.len(),
        "executions": executions,
    })))
}

pub async fn clear_history(State(state): State<AppState>) -> Json<Value> {
    let mut control = state.invoker.control().lock().await;
    let cleared = control.history().len();
    control.history_mut().clear();
    tracing::info!(cleared, "execution history cleared");
    Json(json!({ "cleared": cleared }))
}

pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let control = state.invoker.control().lock().await;
    let stats = UsageStatsCollector.compute(control.history().iter());
    Ok(Json(serde_json::to_value(stats).map_err(Error::from)?))
}
