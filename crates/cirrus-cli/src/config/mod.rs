//! CLI configuration management.
//!
//! ```text
//! Cli
//! ├── storage: StorageConfig   # provider, project, token, endpoint, timeouts
//! ├── pretty: bool             # output formatting
//! └── command: Command         # ls, stat, cat, cp, rm, mb, rb
//! ```
//!
//! Storage settings can be provided via CLI arguments or environment
//! variables. Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! cirrus --storage-project my-project ls gs://my-bucket/logs/
//!
//! # Or via environment variables
//! CIRRUS_STORAGE_PROJECT=my-project cirrus ls gs://my-bucket/logs/
//! ```

use std::process;

use anyhow::Context;
use cirrus_storage::StorageConfig;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::commands::{Command, Output};
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "cirrus")]
#[command(about = "Bucket and blob access for Google Cloud Storage")]
#[command(version)]
pub struct Cli {
    /// Storage backend configuration.
    #[clap(flatten)]
    pub storage: StorageConfig,

    /// Pretty-print JSON records
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so that clap's `env` fallbacks see its
    /// values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing on stderr with environment-based filtering.
    ///
    /// Stdout is reserved for command output.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    /// Returns the output settings for the selected command.
    pub fn output(&self) -> Output {
        Output::new(self.pretty)
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.storage
            .validate()
            .context("invalid storage configuration")?;
        Ok(())
    }

    /// Logs build information and configuration at debug level (no secrets).
    pub fn log_config(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );

        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            provider = %self.storage.provider(),
            project = ?self.storage.project(),
            endpoint = ?self.storage.storage_endpoint,
            access_token = ?self.storage.access_token_masked(),
            command = self.command.name(),
            "Storage configuration"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_storage_flags_and_command() {
        let cli = Cli::try_parse_from([
            "cirrus",
            "--storage-provider",
            "memory",
            "--pretty",
            "ls",
            "gs://bucket/logs/",
        ])
        .unwrap();

        assert_eq!(cli.storage.provider(), cirrus_storage::Provider::Memory);
        assert!(cli.pretty);
        assert_eq!(cli.command.name(), "ls");
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_provider() {
        let result = Cli::try_parse_from(["cirrus", "--storage-provider", "s3", "rb", "bucket"]);
        assert!(result.is_err());
    }
}
