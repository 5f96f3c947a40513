//! Canopy CLI library: argument parsing, configuration layering and
//! provider wiring for the `canopy` binary.

pub mod cli;
pub mod config;
pub mod error;

pub use cli::{Cli, ProviderArg};
pub use error::{CliError, Result};
