#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod commands;
mod config;

use std::process;

use anyhow::Context;
use cirrus_storage::Storage;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "cirrus_cli::startup";
pub const TRACING_TARGET_COMMANDS: &str = "cirrus_cli::commands";
pub const TRACING_TARGET_CONFIG: &str = "cirrus_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_STARTUP,
            error = %error,
            "command failed"
        );
    }
    eprintln!("Error: {error:#}");

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log_config();
    cli.validate()?;

    let storage = Storage::from_config(&cli.storage).context("failed to initialize storage")?;
    let output = cli.output();
    cli.command.execute(&storage, output).await
}
