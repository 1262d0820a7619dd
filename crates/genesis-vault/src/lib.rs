//! # Genesis Vault
//!
//! Secret store access for Genesis.
//!
//! The canonical backend is [`SafeClient`], a thin typed wrapper around the
//! external `safe` CLI: every invocation pins the target store explicitly,
//! scrubs ambient targeting and debug variables, and returns structured
//! results. [`StoreRegistry`] tracks the stores an operator has configured,
//! and [`MemoryStore`] is the in-memory stand-in the test suites drive the
//! executor and validator against.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod memory;
pub mod registry;

pub use client::SafeClient;
pub use config::VaultConfig;
pub use memory::MemoryStore;
pub use registry::StoreRegistry;
