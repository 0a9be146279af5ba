//! HTTP rendering of detector errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use detector_lib::{DetectorError, ErrorBody, ErrorKind};
use tracing::debug;

pub type ApiResult<T> = Result<T, ApiError>;

/// Error returned from handlers; renders `{"error", "status"}`
#[derive(Debug)]
pub struct ApiError(pub DetectorError);

impl From<DetectorError> for ApiError {
    fn from(err: DetectorError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if self.0.kind() == ErrorKind::Validation {
            debug!(error = %self.0, "Rejected prediction request");
        }

        let body = Json(ErrorBody {
            error: self.0.public_message(),
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}
