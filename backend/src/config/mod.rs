//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, token signing secret and the lockout policy
//! applied to failed signins.

use anyhow::{Context, Result, bail};
use std::env;
use std::str::FromStr;

/// Work factors accepted by bcrypt.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub jwt_secret: String,
    pub jwt_expires_in_seconds: u64,
    pub server_port: u16,
    /// Failed signins tolerated inside the window before the account locks.
    pub auth_max_attempts: u32,
    /// Length of the rolling failure window, also used as the lock duration.
    pub auth_window_minutes: i64,
    pub bcrypt_cost: u32,
    /// Browser origins allowed to call the API. Empty mirrors the request origin.
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL not set")?;
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET not set")?;

        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32)?;
        let acquire_timeout_seconds = parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECONDS", 3u64)?;
        let jwt_expires_in_seconds = parse_or(&lookup, "JWT_EXPIRES_IN_SECONDS", 86400u64)?;
        let server_port = parse_or(&lookup, "SERVER_PORT", 4000u16)?;
        let auth_max_attempts = parse_or(&lookup, "AUTH_MAX_ATTEMPTS", 3u32)?;
        let auth_window_minutes = parse_or(&lookup, "AUTH_WINDOW_MINUTES", 5i64)?;
        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", 10u32)?;
        let cors_allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if auth_max_attempts == 0 {
            bail!("AUTH_MAX_ATTEMPTS must be at least 1");
        }
        if auth_window_minutes <= 0 {
            bail!("AUTH_WINDOW_MINUTES must be a positive number of minutes");
        }
        if !BCRYPT_COST_RANGE.contains(&bcrypt_cost) {
            bail!(
                "BCRYPT_COST must be between {} and {}",
                BCRYPT_COST_RANGE.start(),
                BCRYPT_COST_RANGE.end()
            );
        }

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            jwt_expires_in_seconds,
            server_port,
            auth_max_attempts,
            auth_window_minutes,
            bcrypt_cost,
            cors_allowed_origins,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}
