//! `/api/health` - component checks and the detailed aggregate.

use crate::api::router::{object_body, ApiResult};
use crate::api::AppState;
use crate::status::ALL_COMPONENTS;
use crate::types::Error;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Map, Value};

/// Header selecting a single component check.
pub const HEALTH_CHECK_HEADER: &str = "x-health-check";

/// Header values naming the general check.
const GENERAL_CHECK: &str = "default";

/// Header spellings mapped onto component ids.
fn component_for_header(value: &str) -> &str {
    match value {
        "e2b-desktop" => "e2bDesktop",
        "vnc-stream" => "vncStream",
        other => other,
    }
}

fn unhealthy(status: StatusCode, error: &Error) -> Response {
    let body = json!({
        "status": "unhealthy",
        "error": error.to_string(),
        "timestamp": Utc::now(),
    });
    (status, Json(body)).into_response()
}

pub async fn component(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let selected = headers
        .get(HEALTH_CHECK_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != GENERAL_CHECK);

    match selected {
        None => {
            let health = state.health.refresh().await;
            let components: Map<String, Value> = health
                .checks
                .iter()
                .map(|(id, check)| (id.clone(), json!(check.status)))
                .collect();
            Json(json!({
                "status": health.overall,
                "timestamp": health.timestamp,
                "uptimeSecs": state.started_at.elapsed().as_secs(),
                "version": env!("CARGO_PKG_VERSION"),
                "components": components,
            }))
            .into_response()
        }
        Some(header) => match state.health.check_component(component_for_header(header)).await {
            Ok(check) => {
                let mut body = json!(check);
                body["timestamp"] = json!(Utc::now());
                Json(body).into_response()
            }
            Err(err) => unhealthy(err.status_code(), &err),
        },
    }
}

/// Subsystems to check; defaults to `["all"]`.
fn selected_components(body: &Map<String, Value>) -> crate::types::Result<Vec<String>> {
    match body.get("components") {
        None | Some(Value::Null) => Ok(vec![ALL_COMPONENTS.to_string()]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::validation("components must be strings"))
            })
            .collect(),
        Some(_) => Err(Error::validation("components must be an array")),
    }
}

pub async fn detailed(State(state): State<AppState>, Json(body): Json<Value>) -> ApiResult<Json<Value>> {
    let components = selected_components(&object_body(body)?)?;
    let health = state.health.check(&components).await;
    Ok(Json(serde_json::to_value(health).map_err(Error::from)?))
}
