//! Handle on a resolved object.

use derive_more::Deref;

use crate::io::{BlobReader, BlobWriter};
use crate::types::BlobDescriptor;
use crate::uri::{BlobAddress, BlobId};
use crate::{Error, Result, Storage};

/// A resolved object together with the storage it lives in.
///
/// Dereferences to the [`BlobDescriptor`] snapshot taken when the handle was
/// produced; call [`Blob::reload`] to refresh it.
#[derive(Debug, Clone, Deref)]
pub struct Blob {
    storage: Storage,
    #[deref]
    descriptor: BlobDescriptor,
}

impl Blob {
    pub(crate) fn new(storage: Storage, descriptor: BlobDescriptor) -> Self {
        Self {
            storage,
            descriptor,
        }
    }

    /// Returns the object identifier.
    #[inline]
    pub fn id(&self) -> &BlobId {
        &self.descriptor.id
    }

    /// Returns the descriptor snapshot.
    #[inline]
    pub fn descriptor(&self) -> &BlobDescriptor {
        &self.descriptor
    }

    /// Consumes the handle and returns its descriptor.
    pub fn into_descriptor(self) -> BlobDescriptor {
        self.descriptor
    }

    /// Opens the object for reading.
    pub async fn reader(&self) -> Result<BlobReader> {
        self.storage.blobs().open_reader(self.id()).await
    }

    /// Opens a writer that replaces the object's content, keeping its
    /// metadata.
    pub async fn writer(&self) -> Result<BlobWriter> {
        self.storage.blobs().open_writer(&self.descriptor).await
    }

    /// Copies the object and returns a handle on the copy.
    pub async fn copy_to(&self, target: impl Into<BlobAddress>) -> Result<Blob> {
        self.storage.blobs().copy_blob(self, target).await
    }

    /// Deletes the object; `false` if it was already gone.
    pub async fn delete(&self) -> Result<bool> {
        self.storage.blobs().delete(self.id()).await
    }

    /// Fetches a fresh descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`] if the object was deleted.
    pub async fn reload(&mut self) -> Result<&BlobDescriptor> {
        let descriptor = self
            .storage
            .blobs()
            .get(self.id())
            .await?
            .ok_or_else(|| Error::ObjectNotFound(self.descriptor.id.clone()))?;
        self.descriptor = descriptor;
        Ok(&self.descriptor)
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::BucketDescriptor;

    async fn blob(storage: &Storage, uri: &str) -> Blob {
        storage
            .buckets()
            .get_or_create(&BucketDescriptor::new("b"))
            .await
            .unwrap();
        let descriptor = BlobDescriptor::new(uri.parse().unwrap()).with_content_type("text/plain");
        storage.blobs().create(&descriptor).await.unwrap()
    }

    #[tokio::test]
    async fn writer_keeps_metadata_and_reload_sees_size() {
        let storage = Storage::memory();
        let mut handle = blob(&storage, "gs://b/notes.txt").await;
        assert_eq!(handle.descriptor().len(), 0);

        let mut writer = handle.writer().await.unwrap();
        writer.write(b"hello").await.unwrap();
        writer.close().await.unwrap();

        let reloaded = handle.reload().await.unwrap();
        assert_eq!(reloaded.size, Some(5));
        assert_eq!(reloaded.metadata.content_type.as_deref(), Some("text/plain"));

        let mut reader = handle.reader().await.unwrap();
        assert_eq!(reader.read_to_end().await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn copy_to_then_delete() {
        let storage = Storage::memory();
        let handle = blob(&storage, "gs://b/original").await;

        let copy = handle.copy_to("gs://b/copy").await.unwrap();
        assert_eq!(copy.id().name(), "copy");
        assert_eq!(copy.metadata.content_type.as_deref(), Some("text/plain"));

        assert!(handle.delete().await.unwrap());
        assert!(!handle.delete().await.unwrap());
        assert!(copy.delete().await.unwrap());
    }

    #[tokio::test]
    async fn reload_after_delete_fails() {
        let storage = Storage::memory();
        let mut handle = blob(&storage, "gs://b/gone").await;
        handle.delete().await.unwrap();

        let err = handle.reload().await.unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound(id) if id.name() == "gone"));
    }
}
