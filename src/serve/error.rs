//! Error responses for the events API server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use heatmap::IngestError;

#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// No sample payload with that name.
    #[error("unknown event set: {0}")]
    NotFound(String),

    /// The event name is not a plain file stem.
    #[error("invalid event name: {0}")]
    InvalidName(String),

    /// The sample payload exists but does not ingest.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("internal error: {0}")]
    Internal(#[from] std::io::Error),
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidName(_) => StatusCode::BAD_REQUEST,
            Self::Ingest(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let field = match &self {
            Self::Ingest(e) => e.field().map(str::to_string),
            _ => None,
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "field": field,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
