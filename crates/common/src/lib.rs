//! Shared building blocks for the marketplace crates: logging setup,
//! runtime directory checks and small wire types.

pub mod types;
pub mod utils;
pub mod env;
