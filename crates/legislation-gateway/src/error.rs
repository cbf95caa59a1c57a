//! Error types for the legislation gateway

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use legislation_cache::CacheError;
use legislation_client::ClientError;
use legislation_context::ContextError;
use serde_json::json;
use std::fmt;

/// Startup failures
#[derive(Debug)]
pub enum GatewayError {
    Cache(CacheError),
    Io(Box<std::io::Error>),
    Config(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::Cache(err) => write!(f, "Cache error: {}", err),
            GatewayError::Io(err) => write!(f, "IO error: {}", err),
            GatewayError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for GatewayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GatewayError::Cache(err) => Some(err),
            GatewayError::Io(err) => Some(err.as_ref()),
            GatewayError::Config(_) => None,
        }
    }
}

impl From<CacheError> for GatewayError {
    fn from(err: CacheError) -> Self {
        GatewayError::Cache(err)
    }
}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        GatewayError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for GatewayError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        GatewayError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// Failure of a single tool call, converted to an HTTP response
#[derive(Debug)]
pub enum ToolError {
    BadRequest(String),
    /// No usable context: the tool cannot run at all
    Context(ContextError),
    Upstream(ClientError),
    /// Cache maintenance failed (never raised on the lookup path)
    Cache(CacheError),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ToolError::Context(err) => write!(f, "{}", err),
            ToolError::Upstream(err) => write!(f, "{}", err),
            ToolError::Cache(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ToolError {}

impl From<ContextError> for ToolError {
    fn from(err: ContextError) -> Self {
        ToolError::Context(err)
    }
}

impl From<ClientError> for ToolError {
    fn from(err: ClientError) -> Self {
        ToolError::Upstream(err)
    }
}

impl From<CacheError> for ToolError {
    fn from(err: CacheError) -> Self {
        ToolError::Cache(err)
    }
}

impl IntoResponse for ToolError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ToolError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ToolError::Context(err) => {
                tracing::error!(error = %err, "Tool call has no usable context");
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
            }
            ToolError::Upstream(err) => {
                tracing::warn!(error = %err, "Upstream legislation API call failed");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            ToolError::Cache(err) => {
                tracing::error!(error = %err, "Cache maintenance failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}
