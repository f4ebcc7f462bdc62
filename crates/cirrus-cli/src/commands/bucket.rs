//! Bucket creation and removal commands.

use anyhow::bail;
use cirrus_storage::{BucketDescriptor, Storage, StorageClass};
use clap::Args;
use serde_json::json;

use super::Output;

/// Arguments of `mb`.
#[derive(Debug, Clone, Args)]
pub struct MakeBucketArgs {
    /// Bucket name
    pub name: String,

    /// Bucket location, e.g. EU or us-central1
    #[arg(short, long)]
    pub location: Option<String>,

    /// Default storage class for new objects
    #[arg(short = 'c', long)]
    pub storage_class: Option<StorageClass>,

    /// Keep noncurrent object generations
    #[arg(long)]
    pub versioning: bool,

    /// Succeed without changes when the bucket already exists
    #[arg(long)]
    pub if_missing: bool,
}

impl MakeBucketArgs {
    fn descriptor(&self) -> BucketDescriptor {
        let mut bucket = BucketDescriptor::new(&self.name).with_versioning(self.versioning);
        if let Some(location) = &self.location {
            bucket = bucket.with_location(location);
        }
        if let Some(storage_class) = self.storage_class {
            bucket = bucket.with_storage_class(storage_class);
        }
        bucket
    }

    pub async fn execute(self, storage: &Storage, output: &Output) -> anyhow::Result<()> {
        let descriptor = self.descriptor();
        let bucket = if self.if_missing {
            storage.buckets().get_or_create(&descriptor).await?
        } else {
            storage.buckets().create(&descriptor).await?
        };
        output.emit(&bucket)
    }
}

/// Arguments of `rb`.
#[derive(Debug, Clone, Args)]
pub struct RemoveBucketArgs {
    /// Bucket name
    pub name: String,

    /// Fail when the bucket does not exist
    #[arg(long)]
    pub strict: bool,
}

impl RemoveBucketArgs {
    pub async fn execute(self, storage: &Storage, output: &Output) -> anyhow::Result<()> {
        let deleted = storage.buckets().delete(&self.name).await?;
        if self.strict && !deleted {
            bail!("bucket '{}' not found", self.name);
        }
        output.emit(&json!({ "bucket": self.name, "deleted": deleted }))
    }
}
