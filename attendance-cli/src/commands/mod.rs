//! Command implementations, one module per subcommand group.

pub mod config;
pub mod expected;
pub mod report;
pub mod submit;
