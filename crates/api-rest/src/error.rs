//! Mapping of core errors onto HTTP responses.
//!
//! Every failure leaves the API as `{ "error": <message> }` with a status that lets the caller
//! pick the right message: 429 and 402 are passed through from the AI gateway, input problems are
//! 400 (413 for an oversized body), unknown scans are 404, and everything else is 500.

use crate::types::ErrorRes;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use greenleaf_core::{HistoryError, RelayError};

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorRes {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(e: RelayError) -> Self {
        let status = match e {
            RelayError::MissingImage => StatusCode::BAD_REQUEST,
            RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            RelayError::CreditsExhausted => StatusCode::PAYMENT_REQUIRED,
            RelayError::UpstreamStatus(_)
            | RelayError::EmptyResponse
            | RelayError::Timeout
            | RelayError::Transport(_)
            | RelayError::InvalidEnvelope(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Error in analyze-disease: {}", e);
        }
        Self::new(status, e.to_string())
    }
}

impl From<HistoryError> for ApiError {
    fn from(e: HistoryError) -> Self {
        let status = match e {
            HistoryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            HistoryError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => {
                tracing::error!("History error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self::new(status, e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        Self::new(
            status,
            format!("Invalid request body: {}", rejection.body_text()),
        )
    }
}
