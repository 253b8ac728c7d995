//! Module for database connection setup.
//!
//! This module is responsible for initializing the SQLite connection pool,
//! applying the schema migrations and releasing the pool on shutdown.

use crate::config::Config;
use anyhow::{Context, Result};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::time::Duration;
use tracing::info;

pub mod models;

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    /// Initializes the database connection pool from the application config.
    pub async fn new(config: &Config) -> Result<Self> {
        Self::connect(
            &config.database_url,
            config.max_connections,
            config.acquire_timeout_seconds,
        )
        .await
    }

    /// Opens a pool against `database_url` and brings the schema up to date.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        acquire_timeout_seconds: u64,
    ) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_seconds))
            .connect(database_url)
            .await
            .with_context(|| format!("failed to connect to {}", database_url))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;

        info!(max_connections, "Database connection pool ready");
        Ok(Database { pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}
