//! # ProjectDesk Shared Library
//!
//! This crate contains the data model, authentication primitives and the
//! authorization policy used by the ProjectDesk API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their SQL operations
//! - `auth`: Password hashing, JWT tokens, principal extraction, access policy
//! - `db`: Connection pool and migrations
//! - `timing`: Derived time-tracking fields for projects and tasks

pub mod auth;
pub mod db;
pub mod models;
pub mod timing;

/// Current version of the ProjectDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
