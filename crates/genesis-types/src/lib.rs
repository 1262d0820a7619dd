//! # Genesis Types
//!
//! Core types, traits, and enums shared across all Genesis crates.
//!
//! This crate provides the fundamental building blocks for the Genesis
//! secret lifecycle engine, including:
//!
//! - Type-safe wrappers for environment names and secret paths
//! - Common enums for secret kinds, actions, and check outcomes
//! - The `SecretStore` trait every vault backend implements
//! - Error types and result aliases
//!
//! ## Example
//!
//! ```
//! use genesis_types::{EnvName, CheckStatus};
//!
//! // Create a validated environment name
//! let env = EnvName::new("us-west-prod").unwrap();
//! assert_eq!(env.as_str(), "us-west-prod");
//!
//! // Check outcomes aggregate to the worst result
//! assert_eq!(CheckStatus::Ok.worst(CheckStatus::Warn), CheckStatus::Warn);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod identifiers;
pub mod enums;
pub mod traits;

// Re-export common types for convenience
pub use errors::{GenesisError, Result, StoreError, StoreStatus};
pub use identifiers::{EnvName, split_path_key, validate_secret_path};
pub use enums::{Action, CheckStatus, KeyUsage, SecretType};
pub use traits::{ExportData, SecretStore, X509IssueRequest, X509RenewRequest};
