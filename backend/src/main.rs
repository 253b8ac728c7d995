//! Main entry point for the authgate backend.
//!
//! This file initializes tracing, loads configuration, opens the database,
//! wires the authentication service to its collaborators and serves the HTTP
//! routes until Ctrl+C, closing the connection pool on the way out.

mod api;
mod auth;
mod config;
mod database;
mod errors;
mod repositories;
mod utils;

use std::sync::Arc;

use crate::api::common::ApiResponse;
use crate::auth::lockout::LockoutPolicy;
use crate::auth::service::AuthService;
use crate::repositories::account_repository::AccountRepository;
use crate::utils::crypto::BcryptJwtCrypto;
use crate::utils::jwt::JwtUtils;
use anyhow::Context;
use axum::{Extension, Router, response::Json, routing::get};
use config::Config;
use database::Database;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let db = Database::new(&config).await?;

    let jwt = Arc::new(JwtUtils::new(
        &config.jwt_secret,
        config.jwt_expires_in_seconds,
    ));
    let auth_service = Arc::new(AuthService::new(
        Arc::new(AccountRepository::new(db.pool().clone())),
        Arc::new(BcryptJwtCrypto::new(config.bcrypt_cost, jwt.clone())),
        LockoutPolicy::from_config(&config),
    ));

    let app = Router::new()
        .route("/", get(root_handler))
        .nest("/auth", auth::routes::auth_router())
        .layer(Extension(auth_service))
        .layer(Extension(jwt))
        .layer(api::cors::cors_layer(&config.cors_allowed_origins));

    let bind_address = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("failed to bind {}", bind_address))?;

    info!(
        max_attempts = config.auth_max_attempts,
        window_minutes = config.auth_window_minutes,
        "Starting authgate server on port {}",
        config.server_port
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    db.close().await;
    served.context("server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

async fn root_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "service": "authgate",
            "version": env!("CARGO_PKG_VERSION")
        }),
        "Welcome to authgate API",
    ))
}
