//! Core business logic for the authentication system.
//!
//! `AuthService` decides whether a signup or signin succeeds and drives the
//! per-account lockout state machine. Persistence and cryptography are
//! reached through the `AccountStore` and `Crypto` collaborators handed to
//! the constructor.
//!
//! Two read-then-write sequences here are not atomic against concurrent
//! requests. Signup checks for the name before inserting; the store's unique
//! constraint catches the loser of that race and it is reported as
//! `USERNAME_EXISTS` like the ordinary case. The failed-attempt update is a
//! last-write-wins overwrite, so two simultaneous failures for one account may
//! count as one.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::auth::lockout::{LockStatus, LockoutPolicy, lock_status, record_failure};
use crate::auth::models::{AuthErrorCode, AuthResponse, UserInfo};
use crate::database::models::{Account, NewAccount, ThrottleUpdate};
use crate::errors::{ServiceError, ServiceResult};
use crate::repositories::account_repository::AccountStore;
use crate::utils::crypto::Crypto;
use crate::utils::jwt::TokenSubject;

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

/// Authentication service for handling signup, signin and lockout
pub struct AuthService {
    store: Arc<dyn AccountStore>,
    crypto: Arc<dyn Crypto>,
    policy: LockoutPolicy,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(store: Arc<dyn AccountStore>, crypto: Arc<dyn Crypto>, policy: LockoutPolicy) -> Self {
        Self {
            store,
            crypto,
            policy,
        }
    }

    /// Register a new account.
    ///
    /// Inputs are expected to have passed format validation already. No token
    /// is issued on signup.
    pub async fn signup(&self, name: &str, password: &str) -> ServiceResult<AuthResponse> {
        if self.store.find_by_name(name).await?.is_some() {
            return Ok(username_exists());
        }

        let credential_hash = self.crypto.hash(password).await?;

        let account = match self
            .store
            .insert(NewAccount {
                name: name.to_string(),
                credential_hash,
            })
            .await
        {
            Ok(account) => account,
            Err(ServiceError::AlreadyExists { .. }) => return Ok(username_exists()),
            Err(error) => return Err(error),
        };

        info!(account_id = %account.id, name = %account.name, "Account created");

        Ok(AuthResponse::success(
            "User created successfully",
            user_info(&account),
            None,
        ))
    }

    /// Authenticate an account and issue a bearer token.
    pub async fn signin(&self, name: &str, password: &str) -> ServiceResult<AuthResponse> {
        self.signin_at(name, password, Utc::now()).await
    }

    /// Same as [`AuthService::signin`], evaluated at the instant `now`.
    pub async fn signin_at(
        &self,
        name: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<AuthResponse> {
        // Unknown names and wrong passwords must look identical to the caller.
        let Some(account) = self.store.find_by_name(name).await? else {
            return Ok(invalid_credentials());
        };

        if let LockStatus::Locked { remaining_minutes } = lock_status(&account, now) {
            return Ok(AuthResponse::failure(
                AuthErrorCode::UserLocked,
                format!(
                    "Account is locked. Try again in {} minute(s).",
                    remaining_minutes
                ),
            ));
        }

        if !self
            .crypto
            .verify(password, &account.credential_hash)
            .await?
        {
            return self.fail_attempt(&account, now).await;
        }

        self.store
            .update_throttle(&account.id, ThrottleUpdate::cleared())
            .await?;

        let token = self.crypto.sign(&TokenSubject {
            id: account.id.clone(),
            name: account.name.clone(),
        })?;

        info!(account_id = %account.id, "Signin succeeded");

        Ok(AuthResponse::success(
            "Login successful",
            user_info(&account),
            Some(token),
        ))
    }

    async fn fail_attempt(&self, account: &Account, now: DateTime<Utc>) -> ServiceResult<AuthResponse> {
        let update = record_failure(account, now, &self.policy);
        self.store.update_throttle(&account.id, update).await?;

        let refreshed = self
            .store
            .find_by_id(&account.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Account", &account.id))?;

        if lock_status(&refreshed, now).is_locked() {
            warn!(
                account_id = %account.id,
                failed_attempts = refreshed.failed_attempts,
                "Account locked after repeated failed signins"
            );
            return Ok(AuthResponse::failure(
                AuthErrorCode::UserLocked,
                format!(
                    "Account locked due to too many failed attempts. Try again in {} minutes.",
                    self.policy.window_minutes()
                ),
            ));
        }

        warn!(
            account_id = %account.id,
            failed_attempts = refreshed.failed_attempts,
            "Failed signin attempt"
        );
        Ok(invalid_credentials())
    }
}

fn user_info(account: &Account) -> UserInfo {
    UserInfo {
        id: account.id.clone(),
        name: account.name.clone(),
    }
}

fn invalid_credentials() -> AuthResponse {
    AuthResponse::failure(AuthErrorCode::InvalidCredentials, INVALID_CREDENTIALS_MESSAGE)
}

fn username_exists() -> AuthResponse {
    AuthResponse::failure(AuthErrorCode::UsernameExists, "Username already exists")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory store that counts every write it receives.
    #[derive(Default)]
    struct RecordingStore {
        accounts: Mutex<HashMap<String, Account>>,
        writes: AtomicUsize,
        next_id: AtomicUsize,
    }

    impl RecordingStore {
        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }

        fn get(&self, name: &str) -> Account {
            self.accounts
                .lock()
                .unwrap()
                .values()
                .find(|account| account.name == name)
                .cloned()
                .unwrap()
        }

        fn put(&self, account: Account) {
            self.accounts
                .lock()
                .unwrap()
                .insert(account.id.clone(), account);
        }
    }

    #[async_trait]
    impl AccountStore for RecordingStore {
        async fn find_by_name(&self, name: &str) -> ServiceResult<Option<Account>> {
            Ok(self
                .accounts
                .lock()
                .unwrap()
                .values()
                .find(|account| account.name == name)
                .cloned())
        }

        async fn find_by_id(&self, id: &str) -> ServiceResult<Option<Account>> {
            Ok(self.accounts.lock().unwrap().get(id).cloned())
        }

        async fn insert(&self, account: NewAccount) -> ServiceResult<Account> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.values().any(|existing| existing.name == account.name) {
                return Err(ServiceError::already_exists("Account", account.name));
            }
            let id = format!("account-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            let now = Utc::now();
            let created = Account {
                id: id.clone(),
                name: account.name,
                credential_hash: account.credential_hash,
                failed_attempts: 0,
                last_failed_at: None,
                locked_until: None,
                created_at: now,
                updated_at: now,
            };
            accounts.insert(id, created.clone());
            Ok(created)
        }

        async fn update_throttle(&self, id: &str, update: ThrottleUpdate) -> ServiceResult<Account> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .get_mut(id)
                .ok_or_else(|| ServiceError::not_found("Account", id))?;
            account.failed_attempts = update.failed_attempts;
            account.last_failed_at = update.last_failed_at;
            account.locked_until = update.locked_until;
            Ok(account.clone())
        }
    }

    /// Deterministic stand-in for bcrypt and JWT.
    struct FakeCrypto;

    #[async_trait]
    impl Crypto for FakeCrypto {
        async fn hash(&self, plaintext: &str) -> ServiceResult<String> {
            Ok(format!("hashed::{}", plaintext))
        }

        async fn verify(&self, plaintext: &str, hash: &str) -> ServiceResult<bool> {
            Ok(hash == format!("hashed::{}", plaintext))
        }

        fn sign(&self, subject: &TokenSubject) -> ServiceResult<String> {
            Ok(format!("token::{}::{}", subject.id, subject.name))
        }
    }

    /// Store whose every call fails, standing in for a broken database.
    struct BrokenStore;

    #[async_trait]
    impl AccountStore for BrokenStore {
        async fn find_by_name(&self, _name: &str) -> ServiceResult<Option<Account>> {
            Err(anyhow::anyhow!("connection refused").into())
        }

        async fn find_by_id(&self, _id: &str) -> ServiceResult<Option<Account>> {
            Err(anyhow::anyhow!("connection refused").into())
        }

        async fn insert(&self, _account: NewAccount) -> ServiceResult<Account> {
            Err(anyhow::anyhow!("connection refused").into())
        }

        async fn update_throttle(&self, _id: &str, _update: ThrottleUpdate) -> ServiceResult<Account> {
            Err(anyhow::anyhow!("connection refused").into())
        }
    }

    /// Store where another request registers the name between lookup and insert.
    struct ConcurrentSignupStore;

    #[async_trait]
    impl AccountStore for ConcurrentSignupStore {
        async fn find_by_name(&self, _name: &str) -> ServiceResult<Option<Account>> {
            Ok(None)
        }

        async fn find_by_id(&self, _id: &str) -> ServiceResult<Option<Account>> {
            Ok(None)
        }

        async fn insert(&self, account: NewAccount) -> ServiceResult<Account> {
            Err(ServiceError::already_exists("Account", account.name))
        }

        async fn update_throttle(&self, id: &str, _update: ThrottleUpdate) -> ServiceResult<Account> {
            Err(ServiceError::not_found("Account", id))
        }
    }

    fn service() -> (AuthService, Arc<RecordingStore>) {
        let store = Arc::new(RecordingStore::default());
        let service = AuthService::new(store.clone(), Arc::new(FakeCrypto), LockoutPolicy::default());
        (service, store)
    }

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_signup_creates_account_without_exposing_hash() {
        let (service, store) = service();

        let response = service.signup("alice", "password123").await.unwrap();
        let AuthResponse::Success(success) = response else {
            panic!("expected success");
        };
        assert_eq!(success.message, "User created successfully");
        assert_eq!(success.user.name, "alice");
        assert!(success.token.is_none());

        let stored = store.get("alice");
        assert_eq!(stored.id, success.user.id);
        assert_eq!(stored.credential_hash, "hashed::password123");
        assert_eq!(stored.failed_attempts, 0);
        assert!(stored.last_failed_at.is_none());
        assert!(stored.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_signup_existing_name_does_not_write() {
        let (service, store) = service();
        service.signup("alice", "password123").await.unwrap();
        let writes = store.writes();

        let response = service.signup("alice", "another-password").await.unwrap();
        assert_eq!(response.code(), Some(AuthErrorCode::UsernameExists));
        assert_eq!(response.message(), "Username already exists");
        assert_eq!(store.writes(), writes);
    }

    #[tokio::test]
    async fn test_signup_losing_insert_race_reports_username_exists() {
        let service = AuthService::new(
            Arc::new(ConcurrentSignupStore),
            Arc::new(FakeCrypto),
            LockoutPolicy::default(),
        );

        let response = service
            .signup("alice", "password123")
            .await
            .expect("a lost insert race is a business outcome, not a fault");
        assert_eq!(response.code(), Some(AuthErrorCode::UsernameExists));
        assert_eq!(response.message(), "Username already exists");
    }

    #[tokio::test]
    async fn test_unknown_name_and_wrong_password_are_indistinguishable() {
        let (service, _store) = service();
        service.signup("alice", "password123").await.unwrap();

        let unknown = service.signin_at("mallory", "password123", t0()).await.unwrap();
        let wrong = service.signin_at("alice", "wrong-password", t0()).await.unwrap();

        assert_eq!(unknown.code(), Some(AuthErrorCode::InvalidCredentials));
        assert_eq!(wrong.code(), unknown.code());
        assert_eq!(wrong.message(), unknown.message());
    }

    #[tokio::test]
    async fn test_successful_signin_returns_token_and_resets_state() {
        let (service, store) = service();
        service.signup("alice", "password123").await.unwrap();
        service.signin_at("alice", "nope", t0()).await.unwrap();
        service
            .signin_at("alice", "nope", t0() + Duration::minutes(1))
            .await
            .unwrap();
        assert_eq!(store.get("alice").failed_attempts, 2);

        let response = service
            .signin_at("alice", "password123", t0() + Duration::minutes(2))
            .await
            .unwrap();
        let AuthResponse::Success(success) = response else {
            panic!("expected success");
        };
        let stored = store.get("alice");
        assert_eq!(success.message, "Login successful");
        assert_eq!(
            success.token.as_deref(),
            Some(format!("token::{}::alice", stored.id).as_str())
        );
        assert_eq!(success.user.id, stored.id);
        assert_eq!(success.user.name, "alice");
        assert_eq!(stored.failed_attempts, 0);
        assert!(stored.last_failed_at.is_none());
        assert!(stored.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_third_failure_inside_window_locks() {
        let (service, store) = service();
        service.signup("alice", "password123").await.unwrap();

        let first = service.signin_at("alice", "bad", t0()).await.unwrap();
        let second = service
            .signin_at("alice", "bad", t0() + Duration::minutes(4))
            .await
            .unwrap();
        let third = service
            .signin_at("alice", "bad", t0() + Duration::minutes(8))
            .await
            .unwrap();

        assert_eq!(first.code(), Some(AuthErrorCode::InvalidCredentials));
        assert_eq!(second.code(), Some(AuthErrorCode::InvalidCredentials));
        assert_eq!(third.code(), Some(AuthErrorCode::UserLocked));
        assert_eq!(
            third.message(),
            "Account locked due to too many failed attempts. Try again in 5 minutes."
        );
        assert!(!third.message().contains('3'));

        let stored = store.get("alice");
        assert_eq!(stored.failed_attempts, 3);
        assert_eq!(
            stored.locked_until,
            Some(t0() + Duration::minutes(8) + Duration::minutes(5))
        );
    }

    #[tokio::test]
    async fn test_locked_account_rejects_without_counting() {
        let (service, store) = service();
        service.signup("alice", "password123").await.unwrap();
        for _ in 0..3 {
            service.signin_at("alice", "bad", t0()).await.unwrap();
        }
        let before = store.get("alice");
        let writes = store.writes();

        let fourth = service
            .signin_at("alice", "password123", t0() + Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(fourth.code(), Some(AuthErrorCode::UserLocked));
        assert_eq!(
            fourth.message(),
            "Account is locked. Try again in 5 minute(s)."
        );

        let after = store.get("alice");
        assert_eq!(store.writes(), writes);
        assert_eq!(after.failed_attempts, before.failed_attempts);
        assert_eq!(after.last_failed_at, before.last_failed_at);
    }

    #[tokio::test]
    async fn test_stale_failure_resets_counter() {
        let (service, store) = service();
        service.signup("alice", "password123").await.unwrap();
        service.signin_at("alice", "bad", t0()).await.unwrap();
        service
            .signin_at("alice", "bad", t0() + Duration::minutes(1))
            .await
            .unwrap();

        let later = service
            .signin_at("alice", "bad", t0() + Duration::minutes(11))
            .await
            .unwrap();
        assert_eq!(later.code(), Some(AuthErrorCode::InvalidCredentials));

        let stored = store.get("alice");
        assert_eq!(stored.failed_attempts, 1);
        assert!(stored.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_expired_lock_allows_signin() {
        let (service, store) = service();
        service.signup("alice", "password123").await.unwrap();
        let mut locked = store.get("alice");
        locked.failed_attempts = 3;
        locked.last_failed_at = Some(t0() - Duration::minutes(6));
        locked.locked_until = Some(t0() - Duration::minutes(1));
        store.put(locked);

        let response = service.signin_at("alice", "password123", t0()).await.unwrap();
        assert!(response.is_success());
        assert!(store.get("alice").locked_until.is_none());
    }

    #[tokio::test]
    async fn test_failure_after_expired_lock_restarts_count() {
        let (service, store) = service();
        service.signup("alice", "password123").await.unwrap();
        for _ in 0..3 {
            service.signin_at("alice", "bad", t0()).await.unwrap();
        }

        let response = service
            .signin_at("alice", "bad", t0() + Duration::minutes(6))
            .await
            .unwrap();
        assert_eq!(response.code(), Some(AuthErrorCode::InvalidCredentials));

        let stored = store.get("alice");
        assert_eq!(stored.failed_attempts, 1);
        assert!(stored.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_alice_end_to_end() {
        let (service, store) = service();

        assert!(service.signup("alice", "password123").await.unwrap().is_success());

        service.signin_at("alice", "bad", t0()).await.unwrap();
        assert_eq!(store.get("alice").failed_attempts, 1);
        service
            .signin_at("alice", "bad", t0() + Duration::seconds(10))
            .await
            .unwrap();
        assert_eq!(store.get("alice").failed_attempts, 2);

        let ok = service
            .signin_at("alice", "password123", t0() + Duration::seconds(20))
            .await
            .unwrap();
        let AuthResponse::Success(success) = ok else {
            panic!("expected success");
        };
        assert!(success.token.is_some_and(|token| !token.is_empty()));
        assert_eq!(store.get("alice").failed_attempts, 0);

        let t1 = t0() + Duration::minutes(1);
        let attempts: Vec<_> = [0, 1, 2]
            .into_iter()
            .map(|offset| t1 + Duration::seconds(offset))
            .collect();
        let mut results = Vec::new();
        for at in attempts {
            results.push(service.signin_at("alice", "bad", at).await.unwrap().code());
        }
        assert_eq!(
            results,
            vec![
                Some(AuthErrorCode::InvalidCredentials),
                Some(AuthErrorCode::InvalidCredentials),
                Some(AuthErrorCode::UserLocked),
            ]
        );

        let immediate = service
            .signin_at("alice", "password123", t1 + Duration::seconds(3))
            .await
            .unwrap();
        assert_eq!(immediate.code(), Some(AuthErrorCode::UserLocked));

        let after_window = service
            .signin_at("alice", "password123", t1 + Duration::minutes(6))
            .await
            .unwrap();
        assert!(after_window.is_success());
        let stored = store.get("alice");
        assert_eq!(stored.failed_attempts, 0);
        assert!(stored.last_failed_at.is_none());
        assert!(stored.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_store_faults_propagate_as_errors() {
        let service = AuthService::new(
            Arc::new(BrokenStore),
            Arc::new(FakeCrypto),
            LockoutPolicy::default(),
        );

        assert!(matches!(
            service.signup("alice", "password123").await,
            Err(ServiceError::Database { .. })
        ));
        assert!(matches!(
            service.signin("alice", "password123").await,
            Err(ServiceError::Database { .. })
        ));
    }
}
