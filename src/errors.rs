use crate::services::{ServiceError, tracking_id::TrackingIdError};
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// An HTTP-facing error: a status and a message safe to show callers.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Generic 500; details stay in the server log.
    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidTrackingNumber(_)
            | ServiceError::AlreadyDelivered
            | ServiceError::InvalidHandler(_)
            | ServiceError::NothingToUpdate
            | ServiceError::InvalidCountryCode(_)
            | ServiceError::InvalidOperatorName => AppError::bad_request(err.to_string()),
            ServiceError::Unauthorized => AppError::unauthorized(),
            ServiceError::NotFound => AppError::not_found(err.to_string()),
            ServiceError::SequenceExhausted(_) | ServiceError::Store(_) => {
                tracing::error!("internal failure: {}", err);
                AppError::internal()
            }
        }
    }
}

impl From<TrackingIdError> for AppError {
    fn from(err: TrackingIdError) -> Self {
        ServiceError::from(err).into()
    }
}

/// Malformed JSON, a wrong content type, a missing field or an unknown
/// field all answer 400.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(format!("body not valid: {}", rejection.body_text()))
    }
}
