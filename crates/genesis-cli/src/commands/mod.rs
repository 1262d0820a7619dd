//! Command implementations.

pub mod secrets;
