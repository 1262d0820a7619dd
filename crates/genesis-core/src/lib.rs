//! # Genesis Core
//!
//! Core utilities, logging, and common functionality for the Genesis
//! secret lifecycle engine.
//!
//! This crate provides:
//!
//! - **Logging**: tracing-based structured logging setup
//! - **Terminal**: colored output helpers, controlling-terminal detection
//! - **Process Execution**: argv-array command execution with environment
//!   management and stdin feeding (never a shell over untrusted data)
//! - **Environment**: typed `${VAR}` reference resolution and the
//!   `GENESIS_*` variables the engine consumes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod env;
pub mod log;
pub mod term;
pub mod util;
