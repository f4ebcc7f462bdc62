//! The `cp` command.

use std::path::PathBuf;

use anyhow::{Context, bail};
use cirrus_storage::prelude::{copy_file_to_storage, copy_storage_to_file};
use cirrus_storage::uri::SCHEME;
use cirrus_storage::{BlobId, BlobMetadata, Storage};
use clap::Args;
use serde_json::json;

use super::Output;
use crate::TRACING_TARGET_COMMANDS;

/// Arguments of `cp`.
#[derive(Debug, Clone, Args)]
pub struct CopyArgs {
    /// Local path or gs://bucket/name
    pub source: String,

    /// Local path or gs://bucket/name
    pub destination: String,

    #[clap(flatten)]
    pub metadata: MetadataArgs,
}

/// Metadata applied to uploads.
///
/// When none of these is given, uploads are stored as UTF-8 encoded
/// `application/json`.
#[derive(Debug, Clone, Default, Args)]
pub struct MetadataArgs {
    /// Content-Type of the uploaded blob
    #[arg(long)]
    pub content_type: Option<String>,

    /// Content-Encoding of the uploaded blob
    #[arg(long)]
    pub content_encoding: Option<String>,

    /// Content-Language of the uploaded blob
    #[arg(long)]
    pub content_language: Option<String>,

    /// Content-Disposition of the uploaded blob
    #[arg(long)]
    pub content_disposition: Option<String>,

    /// Cache-Control of the uploaded blob
    #[arg(long)]
    pub cache_control: Option<String>,
}

impl MetadataArgs {
    /// Returns the explicit metadata, or `None` when no flag was given.
    pub fn into_metadata(self) -> Option<BlobMetadata> {
        let metadata = BlobMetadata {
            cache_control: self.cache_control,
            content_disposition: self.content_disposition,
            content_encoding: self.content_encoding,
            content_language: self.content_language,
            content_type: self.content_type,
        };
        (!metadata.is_empty()).then_some(metadata)
    }
}

/// One side of a copy.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Local(PathBuf),
    Remote(BlobId),
}

impl Endpoint {
    fn parse(input: &str) -> anyhow::Result<Self> {
        let is_remote = input
            .split_once(':')
            .is_some_and(|(scheme, _)| scheme == SCHEME);
        if !is_remote {
            return Ok(Self::Local(PathBuf::from(input)));
        }

        let id = input
            .parse()
            .with_context(|| format!("invalid storage address '{input}'"))?;
        Ok(Self::Remote(id))
    }
}

impl CopyArgs {
    pub async fn execute(self, storage: &Storage, output: &Output) -> anyhow::Result<()> {
        let source = Endpoint::parse(&self.source)?;
        let destination = Endpoint::parse(&self.destination)?;
        tracing::debug!(
            target: TRACING_TARGET_COMMANDS,
            source = ?source,
            destination = ?destination,
            "Copying"
        );

        match (source, destination) {
            (Endpoint::Local(path), Endpoint::Remote(id)) => {
                let metadata = self.metadata.into_metadata();
                let stored = copy_file_to_storage(storage, &path, id, metadata)
                    .await
                    .with_context(|| format!("failed to upload {}", path.display()))?;
                output.emit(&stored)
            }
            (Endpoint::Remote(id), Endpoint::Local(path)) => {
                let size = copy_storage_to_file(storage, &id, &path)
                    .await
                    .with_context(|| format!("failed to download {id}"))?;
                output.emit(&json!({
                    "uri": id.to_uri(),
                    "path": path.display().to_string(),
                    "size": size,
                }))
            }
            (Endpoint::Remote(source), Endpoint::Remote(target)) => {
                let copied = storage.blobs().copy(source, target).await?;
                output.emit(&copied)
            }
            (Endpoint::Local(_), Endpoint::Local(_)) => {
                bail!("at least one of source and destination must be a gs:// address")
            }
        }
    }
}
