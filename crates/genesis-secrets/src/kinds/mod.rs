//! Secret kind implementations.
//!
//! One module per kind, each carrying the full capability set: parsing
//! from kit metadata, description, expected store keys, and validation of
//! existing material.

pub mod dhparams;
pub mod error;
pub mod provided;
pub mod random;
pub mod rsa;
pub mod ssh;
pub mod uuid;
pub mod x509;
