use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Every failure a handler can produce. Converted to a structured
/// JSON body at the response boundary; nothing crashes per-request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or missing input.
    #[error("{0}")]
    Validation(String),

    /// Duplicate username at registration.
    #[error("{0}")]
    Conflict(String),

    /// Bad credentials at login. One message for both the unknown-user
    /// and wrong-password cases so neither can be probed.
    #[error("Invalid username or password.")]
    InvalidCredentials,

    /// No valid session on a protected route.
    #[error("Unauthorized. Please log in.")]
    Unauthorized,

    /// Missing record, or a record owned by someone else. The message
    /// does not distinguish the two.
    #[error("{0}")]
    NotFound(String),

    /// The blob store failed or could not be reached.
    #[error("{0}")]
    Storage(String),

    /// The record store failed, or never came up at startup. One
    /// uniform message for every data-dependent route.
    #[error("Database Error")]
    Database,

    /// Anything else that should never happen in a healthy process.
    #[error("Internal Server Error")]
    Internal,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::Database | ApiError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("API error {}: {}", status, self);
        }
        (
            status,
            Json(ErrorBody {
                success: false,
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
