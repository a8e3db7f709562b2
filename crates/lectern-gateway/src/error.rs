use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lectern_core::LecternError;
use tracing::error;

/// Errors returned by the HTTP handlers as `{"detail": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(LecternError),
}

impl From<LecternError> for ApiError {
    fn from(err: LecternError) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::Internal(err) => {
                error!(error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
