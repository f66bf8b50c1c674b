//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use axum::http::StatusCode;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the control core.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed request, e.g. a missing required field (HTTP 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Unknown tool id (HTTP 404).
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// Known tool that is disabled or erroring (HTTP 503).
    #[error("tool unavailable: {0}")]
    ToolUnavailable(String),

    /// Any other missing resource (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// External call exceeded its bound (HTTP 504).
    #[error("timeout: {0}")]
    Timeout(String),

    /// External collaborator raised or rejected (HTTP 502).
    #[error("external call failed: {0}")]
    ExternalCall(String),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// Internal errors (HTTP 500).
    #[error("internal error: {0}")]
    Internal(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client errors.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map to the HTTP status returned by the API layer.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::ToolNotFound(_) | Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::ToolUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::ExternalCall(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Config(_)
            | Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code, used in logs and error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::ToolNotFound(_) => "TOOL_NOT_FOUND",
            Error::ToolUnavailable(_) => "TOOL_UNAVAILABLE",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Timeout(_) => "TIMEOUT",
            Error::ExternalCall(_) | Error::Http(_) => "EXTERNAL_CALL_FAILURE",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Internal(_) | Error::Serialization(_) | Error::Io(_) => "INTERNAL",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn tool_not_found(tool_id: impl Into<String>) -> Self {
        Self::ToolNotFound(tool_id.into())
    }

    pub fn tool_unavailable(msg: impl Into<String>) -> Self {
        Self::ToolUnavailable(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn external(msg: impl Into<String>) -> Self {
        Self::ExternalCall(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
