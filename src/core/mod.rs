//! Core building blocks shared by every pack-release command
//!
//! - **config**: release.toml parsing and validation
//! - **context**: Release context built once in main and passed by reference
//! - **error**: Error types with contextual help messages and exit codes
//! - **http**: Blocking HTTP client with bounded retry and backoff
//! - **vcs**: Git operations (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod vcs;
