use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

/// Service-level failure taxonomy.
///
/// Every HTTP handler funnels into this type. `Internal` never leaks its
/// detail to the caller; the wrapped error is logged server-side only.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Bad or missing upload. The user must retry with valid audio.
    #[error("{0}")]
    InvalidInput(String),

    /// A required external credential is not configured.
    #[error("{0} not configured")]
    ServiceUnavailable(&'static str),

    /// External speech-to-text or labeling call failed or returned
    /// unusable output, and no fallback applied.
    #[error("upstream capability failed: {0}")]
    UpstreamFailure(String),

    /// Record lookup miss on delete.
    #[error("transcription {0} not found")]
    NotFound(String),

    /// Anything else unexpected. Generic message to the caller.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServiceError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ServiceError::ServiceUnavailable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ServiceError::UpstreamFailure(_) => {
                error!("{}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to transcribe audio".to_string(),
                )
            }
            ServiceError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServiceError::Internal(e) => {
                error!("internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                error: message,
            }),
        )
            .into_response()
    }
}
