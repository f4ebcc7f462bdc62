//! Blob inspection and deletion commands.

use std::num::NonZeroU32;

use anyhow::{Context, bail};
use cirrus_storage::{BlobId, ListOptions, Storage};
use clap::Args;
use futures::StreamExt;
use serde_json::json;
use tokio::io::AsyncWriteExt;

use super::Output;
use crate::TRACING_TARGET_COMMANDS;

/// Arguments of `ls`.
#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Location to list: gs://bucket or gs://bucket/prefix
    pub location: String,

    /// List every blob under the prefix instead of one directory level
    #[arg(short, long)]
    pub recursive: bool,

    /// Include noncurrent generations
    #[arg(long)]
    pub versions: bool,

    /// Number of entries requested per page
    #[arg(long)]
    pub page_size: Option<NonZeroU32>,
}

impl ListArgs {
    pub async fn execute(self, storage: &Storage, output: &Output) -> anyhow::Result<()> {
        let mut options = ListOptions::new()
            .with_current_directory(!self.recursive)
            .with_versions(self.versions);
        if let Some(page_size) = self.page_size {
            options = options.with_page_size(page_size);
        }

        let listing = storage.blobs().ls(self.location.as_str(), options)?;
        let mut blobs = listing.stream();
        let mut count = 0usize;
        while let Some(blob) = blobs.next().await {
            let blob = blob.with_context(|| format!("failed to list {}", self.location))?;
            output.emit(&blob)?;
            count += 1;
        }

        tracing::debug!(target: TRACING_TARGET_COMMANDS, location = %self.location, count, "Listed");
        Ok(())
    }
}

/// Arguments of `stat`.
#[derive(Debug, Clone, Args)]
pub struct StatArgs {
    /// Blob address: gs://bucket/name
    pub uri: BlobId,
}

impl StatArgs {
    pub async fn execute(self, storage: &Storage, output: &Output) -> anyhow::Result<()> {
        match storage.blobs().get(&self.uri).await? {
            Some(blob) => output.emit(&blob),
            None => bail!("{} not found", self.uri),
        }
    }
}

/// Arguments of `cat`.
#[derive(Debug, Clone, Args)]
pub struct CatArgs {
    /// Blob address: gs://bucket/name
    pub uri: BlobId,
}

impl CatArgs {
    pub async fn execute(self, storage: &Storage) -> anyhow::Result<()> {
        let mut reader = storage.blobs().open_reader(&self.uri).await?;
        let mut stdout = tokio::io::stdout();

        while let Some(chunk) = reader.read_chunk().await? {
            stdout
                .write_all(&chunk)
                .await
                .context("failed to write to stdout")?;
        }

        reader.close();
        stdout.flush().await?;
        Ok(())
    }
}

/// Arguments of `rm`.
#[derive(Debug, Clone, Args)]
pub struct RemoveArgs {
    /// Blob addresses: gs://bucket/name
    #[arg(required = true)]
    pub uris: Vec<BlobId>,

    /// Fail when a blob does not exist
    #[arg(long)]
    pub strict: bool,
}

impl RemoveArgs {
    pub async fn execute(self, storage: &Storage, output: &Output) -> anyhow::Result<()> {
        for uri in &self.uris {
            let deleted = storage.blobs().delete(uri).await?;
            if self.strict && !deleted {
                bail!("{uri} not found");
            }
            output.emit(&json!({ "uri": uri.to_uri(), "deleted": deleted }))?;
        }
        Ok(())
    }
}
