use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Main error type for store and replication operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unreachable: {0}")]
    Connectivity(String),

    #[error("invalid input: {0}")]
    Constraint(String),

    #[error("replication to {replica} failed: {reason}")]
    Replication { replica: String, reason: String },

    #[error("query failed on {store}: {reason}")]
    Query { store: String, reason: String },

    #[error("relation \"records\" does not exist on {0}")]
    SchemaMissing(String),

    #[error("{op} timed out on {store} after {timeout_ms}ms")]
    Timeout {
        store: String,
        op: &'static str,
        timeout_ms: u64,
    },
}

impl StoreError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Connectivity(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Constraint(_) => StatusCode::BAD_REQUEST,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Replication { .. } | Self::Query { .. } | Self::SchemaMissing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Implement IntoResponse for Axum integration
impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
