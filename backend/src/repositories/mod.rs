//! Persistence layer.

pub mod account_repository;
