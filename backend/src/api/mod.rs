//! Shared pieces of the HTTP API.
//!
//! Authentication routes live in `crate::auth`; this module holds the response
//! helpers they and the root endpoint use, and the cross-origin policy applied
//! to the whole router.

pub mod common;
pub mod cors;
