//! Host and service status endpoint.

use crate::api::router::{ApiError, ApiResult};
use crate::api::AppState;
use crate::types::Error;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;

pub async fn status(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let status = state
        .system
        .status()
        .await
        .map_err(|e| ApiError::with_status(e, StatusCode::INTERNAL_SERVER_ERROR))?;
    Ok(Json(serde_json::to_value(status).map_err(Error::from)?))
}
