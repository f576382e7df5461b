//! Subcommand implementations

pub mod fetch;
pub mod name;
pub mod serve;
