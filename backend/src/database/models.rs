//! Rust structs that represent database table mappings.
//!
//! These models define the structure of data as it is stored in and retrieved
//! from the database. Note that these differ from the API-facing models in
//! `auth::models`, which never expose the credential hash.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// A stored account row. Never serialized; responses go through `UserInfo`.
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub credential_hash: String,
    pub failed_attempts: i64,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data required to insert a new account row.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub credential_hash: String,
}

/// The mutable throttle fields of an account, written together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleUpdate {
    pub failed_attempts: i64,
    pub last_failed_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
}

impl ThrottleUpdate {
    /// State written after a successful signin.
    pub fn cleared() -> Self {
        Self {
            failed_attempts: 0,
            last_failed_at: None,
            locked_until: None,
        }
    }
}
