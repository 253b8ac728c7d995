//! Credential hashing and token issuing primitives.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let crypto = BcryptJwtCrypto::new(10, jwt_utils);
//! let hash = crypto.hash("correct horse").await?;
//! assert!(crypto.verify("correct horse", &hash).await?);
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::{ServiceError, ServiceResult};
use crate::utils::jwt::{JwtUtils, TokenSubject};

/// One-way credential hashing plus bearer token signing.
#[async_trait]
pub trait Crypto: Send + Sync {
    /// Salted, slow, one-way hash of `plaintext`.
    async fn hash(&self, plaintext: &str) -> ServiceResult<String>;

    /// Checks `plaintext` against a hash produced by [`Crypto::hash`].
    async fn verify(&self, plaintext: &str, hash: &str) -> ServiceResult<bool>;

    /// Issues an opaque bearer token embedding the subject.
    fn sign(&self, subject: &TokenSubject) -> ServiceResult<String>;
}

/// bcrypt for credentials, HS256 JWT for tokens.
pub struct BcryptJwtCrypto {
    cost: u32,
    jwt: Arc<JwtUtils>,
}

impl BcryptJwtCrypto {
    pub fn new(cost: u32, jwt: Arc<JwtUtils>) -> Self {
        Self { cost, jwt }
    }
}

#[async_trait]
impl Crypto for BcryptJwtCrypto {
    async fn hash(&self, plaintext: &str) -> ServiceResult<String> {
        let plaintext = plaintext.to_owned();
        let cost = self.cost;

        // bcrypt is deliberately slow; keep it off the async workers.
        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|e| ServiceError::internal_error(format!("Hashing task failed: {}", e)))?
            .map_err(|e| ServiceError::crypto(format!("Password hashing failed: {}", e)))
    }

    async fn verify(&self, plaintext: &str, hash: &str) -> ServiceResult<bool> {
        let plaintext = plaintext.to_owned();
        let hash = hash.to_owned();

        tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash))
            .await
            .map_err(|e| ServiceError::internal_error(format!("Verification task failed: {}", e)))?
            .map_err(|e| ServiceError::crypto(format!("Password verification failed: {}", e)))
    }

    fn sign(&self, subject: &TokenSubject) -> ServiceResult<String> {
        self.jwt.generate_token(subject)
    }
}
