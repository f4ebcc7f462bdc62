//! Caller-owned storage service handle.

use std::fmt;
use std::sync::Arc;

use tracing::{error, info, instrument};

use crate::backend::Backend;
use crate::operations::{BlobOperations, BucketOperations};
use crate::{Error, Provider, Result, StorageConfig, TRACING_TARGET_CLIENT};

/// Handle to a storage backend.
///
/// Cheap to clone and safe to share between tasks: the handle itself holds
/// no mutable state besides whatever connection pooling the backend owns.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn Backend>,
}

impl Storage {
    /// Wraps a backend.
    pub fn new(backend: impl Backend) -> Self {
        Self {
            backend: Arc::new(backend),
        }
    }

    /// Wraps a shared backend.
    pub fn from_backend(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Builds the backend selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or selects a backend
    /// whose feature is not compiled in.
    #[instrument(skip(config), target = TRACING_TARGET_CLIENT, fields(provider = %config.provider()))]
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        config.validate().inspect_err(|e| {
            error!(target: TRACING_TARGET_CLIENT, error = %e, "Configuration validation failed");
        })?;

        let storage = match config.provider() {
            #[cfg(feature = "gcs")]
            Provider::Gcs => Self::new(crate::backend::GcsBackend::new(config)?),
            #[cfg(feature = "memory")]
            Provider::Memory => Self::new(crate::backend::MemoryBackend::new()),
            #[allow(unreachable_patterns)]
            provider => {
                return Err(Error::config(format!(
                    "Provider '{provider}' is not enabled in this build"
                )));
            }
        };

        info!(
            target: TRACING_TARGET_CLIENT,
            backend = storage.backend.name(),
            "Storage initialized"
        );

        Ok(storage)
    }

    /// Creates a handle on a fresh in-memory backend.
    #[cfg(feature = "memory")]
    #[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
    pub fn memory() -> Self {
        Self::new(crate::backend::MemoryBackend::new())
    }

    /// Returns bucket operations bound to this handle.
    pub fn buckets(&self) -> BucketOperations {
        BucketOperations::new(self.clone())
    }

    /// Returns blob operations bound to this handle.
    pub fn blobs(&self) -> BlobOperations {
        BlobOperations::new(self.clone())
    }

    /// Returns the backend.
    #[inline]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage")
            .field("backend", &self.backend.name())
            .finish()
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;

    #[test]
    fn builds_memory_backend_from_config() {
        let storage = Storage::from_config(&StorageConfig::memory()).unwrap();
        assert_eq!(storage.backend().name(), "memory");
        assert_eq!(format!("{storage:?}"), r#"Storage { backend: "memory" }"#);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = StorageConfig::memory().with_connect_timeout_secs(0);
        assert!(matches!(
            Storage::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn clones_share_the_backend() {
        let storage = Storage::memory();
        let clone = storage.clone();

        storage
            .buckets()
            .create(&crate::BucketDescriptor::new("shared"))
            .await
            .unwrap();
        assert!(clone.buckets().get("shared").await.unwrap().is_some());
    }
}
