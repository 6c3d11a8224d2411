//! mteval CLI library
//!
//! This library provides the command-line interface for the mteval
//! machine translation evaluation engine.

pub mod commands;
pub mod error;
pub mod input;
pub mod output;
pub mod progress;

pub use error::{CliError, CliResult};
