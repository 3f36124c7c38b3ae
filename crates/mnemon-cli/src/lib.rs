//! mnemon command line interface.
//!
//! # Modules
//!
//! - `cli`: command-line argument parsing with clap
//! - `commands`: command implementations over the engine

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::run;
