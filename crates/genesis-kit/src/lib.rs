//! # Genesis Kit
//!
//! Kit metadata loading for the secret lifecycle engine.
//!
//! A kit's `kit.yml` declares, among other things, the secrets each feature
//! needs. This crate loads and validates that metadata and hands the merged
//! secret groupings to the plan parser; kit fetching and extraction are the
//! concern of outer tooling.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod metadata;

pub use metadata::{FeatureMetadata, KitMetadata};
