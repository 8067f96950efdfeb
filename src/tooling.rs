//! Tooling Layer
//!
//! Command-line access to a workspace's page store.

pub mod cli;

pub use cli::{BlockCommands, Cli, CliContext, Commands, PageCommands};
