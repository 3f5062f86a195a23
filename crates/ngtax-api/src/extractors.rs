//! # Request Bodies
//!
//! Calculator and override handlers take `Result<Json<T>, JsonRejection>`
//! so a body serde cannot decode (a string where an amount belongs, a
//! missing `grossIncome`) still answers with the JSON error envelope rather
//! than axum's plain-text rejection.
//!
//! Requests carrying rules serde cannot express, such as a non-empty
//! override map or a bounded disposal batch, implement [`Validate`] and are
//! read with [`extract_validated_json`]. Those failures are 422 and name the
//! offending field.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Request-level checks that run after deserialization.
pub trait Validate {
    /// Reject the request, naming the field at fault.
    fn validate(&self) -> Result<(), AppError>;
}

/// Unwrap a JSON body. Rejections become [`AppError::BadRequest`].
pub fn extract_json<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match result {
        Ok(Json(value)) => Ok(value),
        Err(JsonRejection::MissingJsonContentType(_)) => Err(AppError::BadRequest(
            "request body must be sent as application/json".to_string(),
        )),
        Err(rejection) => Err(AppError::BadRequest(rejection.body_text())),
    }
}

/// [`extract_json`], then [`Validate::validate`].
pub fn extract_validated_json<T: Validate>(
    result: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let request = extract_json(result)?;
    request.validate()?;
    Ok(request)
}
