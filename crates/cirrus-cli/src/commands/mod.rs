//! Subcommands and their output.

mod bucket;
mod copy;
mod object;

use std::io::Write;

use anyhow::Context;
use cirrus_storage::Storage;
use cirrus_storage::coerce::ToRecord;
use clap::Subcommand;

pub use self::bucket::{MakeBucketArgs, RemoveBucketArgs};
pub use self::copy::CopyArgs;
pub use self::object::{CatArgs, ListArgs, RemoveArgs, StatArgs};

/// Storage command.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List blobs under gs://bucket[/prefix]
    Ls(ListArgs),
    /// Print the descriptor of a blob
    Stat(StatArgs),
    /// Write the content of a blob to stdout
    Cat(CatArgs),
    /// Copy between local files and gs:// addresses
    Cp(CopyArgs),
    /// Delete blobs
    Rm(RemoveArgs),
    /// Create a bucket
    Mb(MakeBucketArgs),
    /// Delete an empty bucket
    Rb(RemoveBucketArgs),
}

impl Command {
    /// Returns the subcommand name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ls(_) => "ls",
            Self::Stat(_) => "stat",
            Self::Cat(_) => "cat",
            Self::Cp(_) => "cp",
            Self::Rm(_) => "rm",
            Self::Mb(_) => "mb",
            Self::Rb(_) => "rb",
        }
    }

    /// Runs the command against `storage`.
    pub async fn execute(self, storage: &Storage, output: Output) -> anyhow::Result<()> {
        match self {
            Self::Ls(args) => args.execute(storage, &output).await,
            Self::Stat(args) => args.execute(storage, &output).await,
            Self::Cat(args) => args.execute(storage).await,
            Self::Cp(args) => args.execute(storage, &output).await,
            Self::Rm(args) => args.execute(storage, &output).await,
            Self::Mb(args) => args.execute(storage, &output).await,
            Self::Rb(args) => args.execute(storage, &output).await,
        }
    }
}

/// Writes records to stdout, one JSON document per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pretty: bool,
}

impl Output {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Prints the record form of `value`.
    pub fn emit<T: ToRecord + ?Sized>(&self, value: &T) -> anyhow::Result<()> {
        let record = value.to_record().context("failed to build output record")?;
        let line = self.render(&record)?;

        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{line}").context("failed to write to stdout")?;
        Ok(())
    }

    fn render(&self, record: &cirrus_storage::coerce::Record) -> anyhow::Result<String> {
        let line = if self.pretty {
            serde_json::to_string_pretty(record)?
        } else {
            serde_json::to_string(record)?
        };
        Ok(line)
    }
}
