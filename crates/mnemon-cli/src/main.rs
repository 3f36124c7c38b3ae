//! mnemon: a layered memory engine for conversational applications.
//!
//! # Usage
//!
//! ```bash
//! mnemon store "Prefers dark mode" --kind semantic --tag preference
//! mnemon recall --tag preference
//! mnemon maintain --dry-run
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/mnemon/config.toml)
//! 3. Environment variables (MNEMON_*, nested keys use `__`)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use mnemon_cli::{run, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}
