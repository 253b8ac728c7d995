//! Database repository for account persistence.
//!
//! Defines the narrow `AccountStore` interface the authentication service
//! depends on, and its SQLite implementation.

use crate::database::models::{Account, NewAccount, ThrottleUpdate};
use crate::errors::{ServiceError, ServiceResult};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, name, credential_hash, failed_attempts, last_failed_at, \
     locked_until, created_at, updated_at";

/// Keyed record store for accounts.
///
/// Implementations give read-your-writes consistency within a single request.
/// They are not required to serialize concurrent writers on the same account.
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_name(&self, name: &str) -> ServiceResult<Option<Account>>;

    async fn find_by_id(&self, id: &str) -> ServiceResult<Option<Account>>;

    /// Inserts a fresh account with a cleared throttle state.
    ///
    /// Returns `ServiceError::AlreadyExists` when the name is already taken.
    async fn insert(&self, account: NewAccount) -> ServiceResult<Account>;

    /// Overwrites the throttle fields of the account identified by `id`.
    async fn update_throttle(&self, id: &str, update: ThrottleUpdate) -> ServiceResult<Account>;
}

/// Repository for account database operations.
#[derive(Clone)]
pub struct AccountRepository {
    /// Shared SQLite connection pool
    pool: SqlitePool,
}

impl AccountRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn get_account_by(&self, column: &str, value: &str) -> Result<Option<Account>> {
        let sql = format!(
            "SELECT {} FROM accounts WHERE {} = ?",
            ACCOUNT_COLUMNS, column
        );
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;

        Ok(account)
    }
}

#[async_trait]
impl AccountStore for AccountRepository {
    async fn find_by_name(&self, name: &str) -> ServiceResult<Option<Account>> {
        Ok(self.get_account_by("name", name).await?)
    }

    async fn find_by_id(&self, id: &str) -> ServiceResult<Option<Account>> {
        Ok(self.get_account_by("id", id).await?)
    }

    async fn insert(&self, account: NewAccount) -> ServiceResult<Account> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO accounts (id, name, credential_hash, failed_attempts, last_failed_at, \
             locked_until, created_at, updated_at) \
             VALUES (?, ?, ?, 0, NULL, NULL, ?, ?) \
             RETURNING {}",
            ACCOUNT_COLUMNS
        );

        let inserted = sqlx::query_as::<_, Account>(&sql)
            .bind(&id)
            .bind(&account.name)
            .bind(&account.credential_hash)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await;

        match inserted {
            Ok(row) => Ok(row),
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                Err(ServiceError::already_exists("Account", account.name))
            }
            Err(error) => Err(anyhow::Error::from(error).into()),
        }
    }

    async fn update_throttle(&self, id: &str, update: ThrottleUpdate) -> ServiceResult<Account> {
        let sql = format!(
            "UPDATE accounts \
             SET failed_attempts = ?, last_failed_at = ?, locked_until = ?, updated_at = ? \
             WHERE id = ? \
             RETURNING {}",
            ACCOUNT_COLUMNS
        );

        let updated = sqlx::query_as::<_, Account>(&sql)
            .bind(update.failed_attempts)
            .bind(update.last_failed_at)
            .bind(update.locked_until)
            .bind(Utc::now())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(anyhow::Error::from)?;

        updated.ok_or_else(|| ServiceError::not_found("Account", id))
    }
}
