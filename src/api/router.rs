//! Route table and shared response helpers.

use crate::api::{handlers, AppState};
use crate::types::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the full router over the given state.
pub fn build_router(state: AppState, permissive_cors: bool) -> Router {
    let router = Router::new()
        .route("/api/mcp/tools", get(handlers::mcp::list_tools))
        .route("/api/mcp/tools/{id}/health", get(handlers::mcp::tool_health))
        .route("/api/mcp/status", get(handlers::mcp::gateway_status))
        .route("/api/mcp/restart", post(handlers::mcp::restart_gateway))
        .route(
            "/api/mcp/execute",
            post(handlers::mcp::execute).get(handlers::mcp::execution_status),
        )
        .route(
            "/api/mcp/history",
            get(handlers::mcp::history).delete(handlers::mcp::clear_history),
        )
        .route("/api/mcp/stats", get(handlers::mcp::stats))
        .route("/api/agent/start", post(handlers::agent::start))
        .route("/api/agent/stop", post(handlers::agent::stop))
        .route("/api/system/status", get(handlers::system::status))
        .route(
            "/api/health",
            get(handlers::health::component).post(handlers::health::detailed),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if permissive_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

// =============================================================================
// Error responses
// =============================================================================

/// An [`Error`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    status: Option<StatusCode>,
}

impl ApiError {
    /// Answer with a fixed status regardless of the error kind.
    pub fn with_status(error: Error, status: StatusCode) -> Self {
        Self {
            error,
            status: Some(status),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self { error, status: None }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status.unwrap_or_else(|| self.error.status_code());
        if status.is_server_error() {
            tracing::error!(code = self.error.code(), error = %self.error, "request failed");
        } else {
            tracing::debug!(code = self.error.code(), error = %self.error, "request rejected");
        }
        let body = json!({
            "error": self.error.to_string(),
            "code": self.error.code(),
        });
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Require a JSON object body.
pub fn object_body(body: Value) -> crate::types::Result<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(Error::validation("request body must be a JSON object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (Error::validation("x"), StatusCode::BAD_REQUEST),
            (Error::tool_not_found("x"), StatusCode::NOT_FOUND),
            (Error::tool_unavailable("x"), StatusCode::SERVICE_UNAVAILABLE),
            (Error::timeout("x"), StatusCode::GATEWAY_TIMEOUT),
            (Error::internal("x"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, expected) in cases {
            assert_eq!(ApiError::from(error).into_response().status(), expected);
        }
    }

    #[test]
    fn test_status_override() {
        let response = ApiError::with_status(Error::external("refused"), StatusCode::INTERNAL_SERVER_ERROR)
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_object_body() {
        assert!(object_body(json!({ "a": 1 })).is_ok());
        assert!(object_body(Value::Null).unwrap().is_empty());
        assert!(object_body(json!([1])).is_err());
    }
}
