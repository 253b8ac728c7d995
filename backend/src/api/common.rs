//! Response helpers shared by the HTTP handlers.
//!
//! Converts service outcomes into HTTP responses:
//! - `ApiResponse` envelope for informational endpoints
//! - `AuthResponse` status code mapping for signup/signin
//! - Validation error formatting
//!
//! # Error Handling Flow
//! 1. Handlers validate the payload and short-circuit with `VALIDATION_ERROR`,
//!    including bodies that cannot be decoded into the request type
//! 2. The service returns either an `AuthResponse` or a `ServiceError`
//! 3. `auth_response_to_http` picks the status code; faults become
//!    `INTERNAL_ERROR` and their details only go to the log

use crate::auth::models::{AuthErrorCode, AuthResponse};
use crate::errors::{ServiceError, ServiceResult};
use axum::{
    extract::rejection::JsonRejection, http::StatusCode, response::Json as ResponseJson,
};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper for informational endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message
    pub message: String,
    /// Response timestamp
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// HTTP status for a failure code
pub fn status_for_code(code: AuthErrorCode) -> StatusCode {
    match code {
        AuthErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthErrorCode::UserLocked => StatusCode::LOCKED,
        AuthErrorCode::UsernameExists => StatusCode::CONFLICT,
        AuthErrorCode::ValidationError => StatusCode::BAD_REQUEST,
        AuthErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Converts a service outcome into a status code and JSON body
pub fn auth_response_to_http(
    result: ServiceResult<AuthResponse>,
    success_status: StatusCode,
) -> (StatusCode, ResponseJson<AuthResponse>) {
    match result {
        Ok(response) => {
            tracing::debug!(
                success = response.is_success(),
                message = response.message(),
                "Authentication outcome"
            );
            let status = response.code().map_or(success_status, status_for_code);
            (status, ResponseJson(response))
        }
        Err(error) => service_error_to_http(error),
    }
}

/// Converts ServiceError to an `INTERNAL_ERROR` response
pub fn service_error_to_http(error: ServiceError) -> (StatusCode, ResponseJson<AuthResponse>) {
    tracing::error!("Authentication request failed: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ResponseJson(AuthResponse::failure(
            AuthErrorCode::InternalError,
            "Internal server error",
        )),
    )
}

/// Formats validator::ValidationErrors as `field: message` pairs
pub fn validation_errors_to_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                format!(
                    "{}: {}",
                    field,
                    error.message.as_ref().unwrap_or(&"Invalid value".into())
                )
            })
        })
        .collect();
    messages.sort();
    messages.join(", ")
}

/// Helper to create validation error response
pub fn validation_error_response(
    errors: validator::ValidationErrors,
) -> (StatusCode, ResponseJson<AuthResponse>) {
    (
        StatusCode::BAD_REQUEST,
        ResponseJson(AuthResponse::failure(
            AuthErrorCode::ValidationError,
            validation_errors_to_message(&errors),
        )),
    )
}

/// Maps an undecodable JSON body to a `VALIDATION_ERROR` response
pub fn json_rejection_response(rejection: JsonRejection) -> (StatusCode, ResponseJson<AuthResponse>) {
    // The rejection text may quote field values, so it is only echoed to the caller.
    tracing::debug!(status = %rejection.status(), "Rejected undecodable request body");
    (
        StatusCode::BAD_REQUEST,
        ResponseJson(AuthResponse::failure(
            AuthErrorCode::ValidationError,
            rejection.body_text(),
        )),
    )
}
