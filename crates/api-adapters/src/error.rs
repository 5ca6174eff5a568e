//! Maps `AppError` onto HTTP statuses and the JSON failure envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domains::AppError;

use crate::response::ApiResponse;

/// HTTP-facing wrapper; the orphan rule keeps `IntoResponse` off `AppError`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::Validation(_) | AppError::Conflict(_) | AppError::InvalidOrExpiredOtp => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Upload(_) | AppError::MailDelivery(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Client-visible text. Infrastructure detail stays in the logs.
    pub fn public_message(&self) -> String {
        match &self.0 {
            AppError::Validation(m)
            | AppError::Conflict(m)
            | AppError::Unauthorized(m)
            | AppError::Forbidden(m) => m.clone(),
            AppError::NotFound(what) => format!("{what} not found."),
            AppError::InvalidOrExpiredOtp => "Invalid or expired OTP.".to_string(),
            AppError::Upload(_) => "Image upload failed.".to_string(),
            AppError::MailDelivery(_) => "Failed to send OTP.".to_string(),
            AppError::Internal(_) => "Internal server error.".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.0.is_internal() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ApiResponse::<()>::failure(self.public_message());
        (self.status(), Json(body)).into_response()
    }
}
