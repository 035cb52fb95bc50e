//! CLI Adapter
//!
//! Command-line interface for the GigaBrain engine.
//! Uses clap derive macros for argument parsing.

mod commands;
mod wiring;

pub use commands::{BlacklistCmd, CliApp, Command, RunCmd, StatusCmd, WalletArg};
pub use wiring::Services;

use anyhow::Result;

/// Parse the command line
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}

/// Execute the CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    commands::execute(app).await
}
