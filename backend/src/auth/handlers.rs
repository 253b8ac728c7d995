//! Handler functions for authentication-related API endpoints.
//!
//! These functions parse request data, validate input, and hand the checked
//! values to `auth::service` for the actual decision.

use std::sync::Arc;

use crate::api::common::{
    auth_response_to_http, json_rejection_response, validation_error_response,
};
use crate::auth::models::*;
use crate::auth::service::AuthService;
use crate::utils::jwt::Claims;
use axum::{
    extract::{Extension, Json, rejection::JsonRejection},
    http::StatusCode,
    response::Json as ResponseJson,
};
use tracing::debug;
use validator::Validate;

/// Handle account registration request
#[axum::debug_handler]
pub async fn signup(
    Extension(auth_service): Extension<Arc<AuthService>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> (StatusCode, ResponseJson<AuthResponse>) {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection_response(rejection),
    };
    debug!(request = ?payload, "Signup requested");

    if let Err(errors) = payload.validate() {
        return validation_error_response(errors);
    }

    let result = auth_service.signup(&payload.name, &payload.password).await;
    auth_response_to_http(result, StatusCode::CREATED)
}

/// Handle signin request
#[axum::debug_handler]
pub async fn signin(
    Extension(auth_service): Extension<Arc<AuthService>>,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> (StatusCode, ResponseJson<AuthResponse>) {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return json_rejection_response(rejection),
    };
    debug!(request = ?payload, "Signin requested");

    if let Err(errors) = payload.validate() {
        return validation_error_response(errors);
    }

    let result = auth_service.signin(&payload.name, &payload.password).await;
    auth_response_to_http(result, StatusCode::OK)
}

/// Get the signed-in account from the token
#[axum::debug_handler]
pub async fn me(Extension(claims): Extension<Claims>) -> ResponseJson<UserInfo> {
    ResponseJson(UserInfo {
        id: claims.account_id().to_string(),
        name: claims.name().to_string(),
    })
}
