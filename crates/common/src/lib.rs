//! Shared types and error machinery used across all lorebot crates.

pub mod error;
pub mod types;

pub use error::{Error, FromMessage, Result};
