use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use weather_core::WeatherError;

/// Failures surfaced to HTTP clients.
///
/// Responses carry a fixed text body; the detail only goes to the log.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("missing or invalid API token")]
    Unauthorized,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<WeatherError> for ApiError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::Validation(msg) => ApiError::BadRequest(msg),
            WeatherError::Conflict(date) => ApiError::Conflict(date),
            e @ (WeatherError::Storage(_) | WeatherError::Format { .. }) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "Invalid Request",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::Conflict(_) => "Conflict",
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => tracing::error!("Request failed: {detail}"),
            other => tracing::warn!("Request rejected: {other}"),
        }
        (self.status(), self.body()).into_response()
    }
}
