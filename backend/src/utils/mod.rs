//! Cryptographic helpers shared by the authentication flow.
//!
//! Password hashing lives in `crypto`, bearer token handling in `jwt`.

pub mod crypto;
pub mod jwt;
