use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use weft_core::FlowError;
use weft_dsl::DslError;

/// Server-level errors, mapped onto HTTP statuses at the boundary.
#[derive(Debug, Error)]
pub enum ServerError {
    /// An engine error surfaced while handling a request
    #[error("flow engine error: {0}")]
    Flow(#[from] FlowError),

    /// A flow document failed to parse, validate or assemble
    #[error("flow definition error: {0}")]
    Dsl(#[from] DslError),

    /// The server configuration is invalid
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An I/O failure while bootstrapping or serving
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

fn status_for_flow_error(err: &FlowError) -> StatusCode {
    match err {
        // Unknown top-level targets are plain 404s.
        FlowError::NoSuchFlow(_) | FlowError::NoSuchExecution(_) => StatusCode::NOT_FOUND,
        // Requests that do not fit the conversation's current status.
        FlowError::InvalidStatus { .. } => StatusCode::CONFLICT,
        // Remaining configuration errors are the client's definition problem.
        err if err.is_configuration_error() => StatusCode::UNPROCESSABLE_ENTITY,
        // Invariant breaches and delegate failures.
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::Flow(err) => status_for_flow_error(err),
            ServerError::Dsl(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Configuration(_) | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
