//! Defines the HTTP routes for authentication.
//!
//! These routes handle signup, signin and token introspection. They expect
//! `Extension<Arc<AuthService>>` and `Extension<Arc<JwtUtils>>` layers to be
//! installed by the main router.

use crate::auth::handlers::*;
use crate::auth::middleware::*;
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Creates the authentication router with all auth-related routes
pub fn auth_router() -> Router {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/me", get(me).layer(middleware::from_fn(jwt_auth)))
}
