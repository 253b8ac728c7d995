//! Data structures for authentication requests and outcomes.
//!
//! Request payloads carry their format rules as `validator` attributes and are
//! checked by the HTTP handlers before the service is invoked. Outcomes are a
//! tagged success/failure value: expected failures such as a taken name or a
//! locked account are data, not errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// Signup request payload
#[derive(Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(
        length(min = 3, max = 50, message = "Name must be between 3-50 characters"),
        custom(function = validate_name_charset)
    )]
    pub name: String,

    #[validate(length(
        min = 8,
        max = 100,
        message = "Password must be between 8-100 characters"
    ))]
    pub password: String,
}

/// Signin request payload
#[derive(Deserialize, Validate)]
pub struct SigninRequest {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

// Passwords must never reach the logs, even through `{:?}`.
impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for SigninRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigninRequest")
            .field("name", &self.name)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn validate_name_charset(name: &str) -> Result<(), ValidationError> {
    if name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("name_charset").with_message(
            "Name can only contain letters, numbers, and underscores".into(),
        ))
    }
}

/// Machine-readable failure codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorCode {
    InvalidCredentials,
    UserLocked,
    UsernameExists,
    ValidationError,
    InternalError,
}

/// Public account information, never including the credential hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSuccess {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub user: UserInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFailure {
    pub success: bool,
    pub message: String,
    pub code: AuthErrorCode,
}

/// Outcome of a signup or signin
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthResponse {
    Success(AuthSuccess),
    Failure(AuthFailure),
}

impl AuthResponse {
    pub fn success(message: impl Into<String>, user: UserInfo, token: Option<String>) -> Self {
        Self::Success(AuthSuccess {
            success: true,
            message: message.into(),
            token,
            user,
        })
    }

    pub fn failure(code: AuthErrorCode, message: impl Into<String>) -> Self {
        Self::Failure(AuthFailure {
            success: false,
            message: message.into(),
            code,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthResponse::Success(_))
    }

    /// Failure code, `None` for a success.
    pub fn code(&self) -> Option<AuthErrorCode> {
        match self {
            AuthResponse::Success(_) => None,
            AuthResponse::Failure(failure) => Some(failure.code),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AuthResponse::Success(success) => &success.message,
            AuthResponse::Failure(failure) => &failure.message,
        }
    }
}
