//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps engine errors to HTTP status codes and JSON bodies of the form
//! `{ "error": { "code", "message", "details"? } }`. Validation failures
//! name the offending field in `details.field`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ngtax_core::{UnknownFieldError, ValidationError};
use ngtax_rates::OverrideError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// A value failed validation (422).
    #[error("validation error: {message}")]
    Validation {
        /// Offending field, when known.
        field: Option<String>,
        /// Description.
        message: String,
    },

    /// An override path does not exist (422).
    #[error("{0}")]
    UnknownField(#[from] UnknownFieldError),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure, missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Conflict with current configuration (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// A validation error with no specific field.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Return the HTTP status code and machine-readable error code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::UnknownField(_) => (StatusCode::UNPROCESSABLE_ENTITY, "UNKNOWN_FIELD"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation {
                field: Some(field), ..
            } => Some(serde_json::json!({ "field": field })),
            Self::UnknownField(e) => Some(serde_json::json!({ "field": e.path })),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::Validation { message, .. } => message.clone(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation {
            field: Some(err.field().to_string()),
            message: err.to_string(),
        }
    }
}

impl From<OverrideError> for AppError {
    fn from(err: OverrideError) -> Self {
        match err {
            OverrideError::UnknownField(e) => Self::UnknownField(e),
            OverrideError::Validation(e) => e.into(),
        }
    }
}
