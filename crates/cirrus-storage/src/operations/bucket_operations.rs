//! Bucket lookup, creation and deletion.

use tracing::{debug, error, info, instrument, warn};

use crate::options::OptionMap;
use crate::types::BucketDescriptor;
use crate::{Error, Result, Storage, TRACING_TARGET_BUCKETS};

/// Bucket operations bound to a [`Storage`] handle.
#[derive(Debug, Clone)]
pub struct BucketOperations {
    storage: Storage,
}

impl BucketOperations {
    /// Creates bucket operations for a storage handle.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Looks up a bucket.
    ///
    /// A missing bucket is `Ok(None)`, not an error.
    #[instrument(skip(self), target = TRACING_TARGET_BUCKETS, fields(bucket = %name))]
    pub async fn get(&self, name: &str) -> Result<Option<BucketDescriptor>> {
        let start = std::time::Instant::now();
        let result = self.storage.backend().get_bucket(name).await;
        let elapsed = start.elapsed();

        match result {
            Ok(bucket) => {
                debug!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %name,
                    found = bucket.is_some(),
                    elapsed = ?elapsed,
                    "Bucket lookup completed"
                );
                Ok(bucket)
            }
            Err(e) => {
                error!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %name,
                    error = %e,
                    elapsed = ?elapsed,
                    "Failed to look up bucket"
                );
                Err(e)
            }
        }
    }

    /// Creates a bucket.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketExists`] if the name is taken, or a backend
    /// error for transport and permission failures.
    #[instrument(skip(self, bucket), target = TRACING_TARGET_BUCKETS, fields(bucket = %bucket.name))]
    pub async fn create(&self, bucket: &BucketDescriptor) -> Result<BucketDescriptor> {
        let start = std::time::Instant::now();
        let result = self.storage.backend().create_bucket(bucket).await;
        let elapsed = start.elapsed();

        match result {
            Ok(created) => {
                info!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %created.name,
                    location = ?created.location,
                    elapsed = ?elapsed,
                    "Bucket created successfully"
                );
                Ok(created)
            }
            Err(e) => {
                error!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %bucket.name,
                    error = %e,
                    elapsed = ?elapsed,
                    "Failed to create bucket"
                );
                Err(e)
            }
        }
    }

    /// Creates a bucket from an option map.
    ///
    /// Recognized keys are `index-page`, `location`, `not-found-page`,
    /// `storage-class` and `versioning-enabled`; anything else is ignored.
    pub async fn create_with(&self, name: &str, options: &OptionMap) -> Result<BucketDescriptor> {
        let bucket = BucketDescriptor::from_options(name, options)?;
        self.create(&bucket).await
    }

    /// Returns the bucket, creating it first if it does not exist.
    ///
    /// The lookup and the creation are separate calls. When another caller
    /// creates the bucket in between, the conflict is resolved by reading the
    /// bucket once more; it propagates only if the bucket is still not
    /// visible.
    #[instrument(skip(self, bucket), target = TRACING_TARGET_BUCKETS, fields(bucket = %bucket.name))]
    pub async fn get_or_create(&self, bucket: &BucketDescriptor) -> Result<BucketDescriptor> {
        if let Some(existing) = self.get(&bucket.name).await? {
            return Ok(existing);
        }

        info!(
            target: TRACING_TARGET_BUCKETS,
            bucket = %bucket.name,
            "Bucket does not exist, creating it"
        );

        match self.create(bucket).await {
            Err(Error::BucketExists(name)) => {
                warn!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %name,
                    "Bucket was created concurrently, reading it back"
                );
                self.get(&name).await?.ok_or(Error::BucketExists(name))
            }
            result => result,
        }
    }

    /// Deletes an empty bucket.
    ///
    /// Returns `false` if the bucket did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BucketNotEmpty`] if the bucket still holds objects.
    #[instrument(skip(self), target = TRACING_TARGET_BUCKETS, fields(bucket = %name))]
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let start = std::time::Instant::now();
        let result = self.storage.backend().delete_bucket(name).await;
        let elapsed = start.elapsed();

        match result {
            Ok(deleted) => {
                info!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %name,
                    deleted,
                    elapsed = ?elapsed,
                    "Bucket deletion completed"
                );
                Ok(deleted)
            }
            Err(e) => {
                error!(
                    target: TRACING_TARGET_BUCKETS,
                    bucket = %name,
                    error = %e,
                    elapsed = ?elapsed,
                    "Failed to delete bucket"
                );
                Err(e)
            }
        }
    }
}
