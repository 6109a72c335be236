//! Configuration module for the attendance core
//!
//! Configuration is read from a TOML file when present and overridden by
//! environment variables.

pub mod types;

pub use types::*;
