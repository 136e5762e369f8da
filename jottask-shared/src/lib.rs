//! # Jottask Shared Library
//!
//! Domain core of Jottask: data model, access policy, plan quotas, email
//! action tokens and the storage backends. The API server is a thin HTTP
//! layer over this crate.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Principal, access token validation, row-level policy, action tokens
//! - `quota`: Plan-based limits on pending tasks and email connections
//! - `store`: The `Store` trait with PostgreSQL and in-memory backends
//! - `services`: Policy-checked operations on behalf of a principal
//! - `db`: Connection pool and migrations
//! - `error`: Domain error type

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod quota;
pub mod services;
pub mod store;

pub use error::{Error, Result};

/// Current version of the Jottask shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
