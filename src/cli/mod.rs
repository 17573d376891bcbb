//! CLI command implementations

pub mod collect;
pub mod error;

pub use collect::{Cli, CollectArgs, Commands};
pub use error::CliError;
