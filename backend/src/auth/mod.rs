//! Authentication module for account registration, signin and lockout.
//!
//! This module provides the public interface for signup and signin, the
//! failed-attempt throttling rules, and the middleware guarding token
//! protected routes.

pub mod handlers;
pub mod lockout;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod service;
