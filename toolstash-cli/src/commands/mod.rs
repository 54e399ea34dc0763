//! Subcommand implementations.

pub mod get;
