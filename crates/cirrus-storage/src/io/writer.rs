use std::fmt;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::backend::ObjectSink;
use crate::types::BlobDescriptor;
use crate::uri::BlobId;
use crate::{Error, Result, TRACING_TARGET_BLOBS};

/// Sequential writer that replaces an object's content.
///
/// Written bytes become visible only once [`BlobWriter::close`] succeeds.
/// [`BlobWriter::abort`] discards them, and so does dropping an open writer.
/// A failed write aborts the upload and leaves the writer closed, so nothing
/// partial is ever published.
pub struct BlobWriter {
    id: BlobId,
    sink: Option<Box<dyn ObjectSink>>,
    descriptor: Option<BlobDescriptor>,
    written: u64,
    /// Set when a write failure aborted the upload.
    failed: bool,
}

impl BlobWriter {
    pub(crate) fn new(id: BlobId, sink: Box<dyn ObjectSink>) -> Self {
        Self {
            id,
            sink: Some(sink),
            descriptor: None,
            written: 0,
            failed: false,
        }
    }

    /// Returns the object being written.
    #[inline]
    pub fn id(&self) -> &BlobId {
        &self.id
    }

    /// Returns the number of bytes accepted so far.
    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Returns whether the writer has been closed or aborted.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.sink.is_none()
    }

    /// Returns the stored object's descriptor once the writer is closed.
    pub fn descriptor(&self) -> Option<&BlobDescriptor> {
        self.descriptor.as_ref()
    }

    /// Appends a copy of `data`.
    pub async fn write(&mut self, data: impl AsRef<[u8]>) -> Result<()> {
        self.write_bytes(Bytes::copy_from_slice(data.as_ref())).await
    }

    /// Appends an owned buffer without copying it.
    pub async fn write_bytes(&mut self, data: Bytes) -> Result<()> {
        let sink = self
            .sink
            .as_mut()
            .ok_or_else(|| Error::ClosedHandle(self.id.clone()))?;

        if data.is_empty() {
            return Ok(());
        }

        let len = data.len() as u64;
        if let Err(e) = sink.write(data).await {
            self.fail().await;
            return Err(e);
        }

        self.written += len;
        Ok(())
    }

    /// Aborts the upload after a failed write.
    async fn fail(&mut self) {
        self.failed = true;
        let Some(sink) = self.sink.take() else {
            return;
        };

        warn!(
            target: TRACING_TARGET_BLOBS,
            blob = %self.id,
            written = self.written,
            "Write failed, upload aborted"
        );
        if let Err(e) = sink.abort().await {
            warn!(
                target: TRACING_TARGET_BLOBS,
                blob = %self.id,
                error = %e,
                "Failed to abort upload"
            );
        }
    }

    /// Finalizes the upload. Closing an already closed writer is a no-op.
    ///
    /// The writer is closed afterwards even if finalizing fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClosedHandle`] if an earlier write failed, since the
    /// upload was discarded.
    pub async fn close(&mut self) -> Result<()> {
        let Some(sink) = self.sink.take() else {
            if self.failed {
                return Err(Error::ClosedHandle(self.id.clone()));
            }
            return Ok(());
        };

        let descriptor = sink.finish().await?;
        debug!(
            target: TRACING_TARGET_BLOBS,
            blob = %self.id,
            written = self.written,
            generation = ?descriptor.generation,
            "Closed writer"
        );

        self.descriptor = Some(descriptor);
        Ok(())
    }

    /// Closes the writer and returns the stored object's descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ClosedHandle`] if the writer was aborted or a write
    /// failed.
    pub async fn finish(mut self) -> Result<BlobDescriptor> {
        self.close().await?;
        self.descriptor
            .take()
            .ok_or_else(|| Error::ClosedHandle(self.id.clone()))
    }

    /// Discards everything written so far. A no-op on a closed writer.
    pub async fn abort(&mut self) -> Result<()> {
        let Some(sink) = self.sink.take() else {
            return Ok(());
        };

        debug!(
            target: TRACING_TARGET_BLOBS,
            blob = %self.id,
            written = self.written,
            "Aborting writer"
        );
        sink.abort().await
    }
}

impl Drop for BlobWriter {
    fn drop(&mut self) {
        if self.sink.is_some() {
            warn!(
                target: TRACING_TARGET_BLOBS,
                blob = %self.id,
                written = self.written,
                "Writer dropped without close, upload discarded"
            );
        }
    }
}

impl fmt::Debug for BlobWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobWriter")
            .field("id", &self.id)
            .field("written", &self.written)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use std::sync::Arc;

    use crate::backend::mock::MockBackend;
    use crate::{BlobDescriptor, BucketDescriptor, Error, Storage};

    async fn storage() -> Storage {
        let storage = Storage::memory();
        storage
            .buckets()
            .create(&BucketDescriptor::new("b"))
            .await
            .unwrap();
        storage
    }

    fn descriptor(name: &str) -> BlobDescriptor {
        BlobDescriptor::new(crate::BlobId::new("b", name).unwrap())
    }

    #[tokio::test]
    async fn content_visible_only_after_close() {
        let storage = storage().await;
        let mut writer = storage.blobs().open_writer(&descriptor("w")).await.unwrap();
        writer.write("partial").await.unwrap();
        assert!(storage.blobs().get("gs://b/w").await.unwrap().is_none());

        writer.close().await.unwrap();
        assert_eq!(writer.written(), 7);
        assert_eq!(writer.descriptor().unwrap().size, Some(7));
        assert!(storage.blobs().get("gs://b/w").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn double_close_and_write_after_close() {
        let storage = storage().await;
        let mut writer = storage.blobs().open_writer(&descriptor("w")).await.unwrap();
        writer.close().await.unwrap();
        writer.close().await.unwrap();

        let err = writer.write(b"late").await.unwrap_err();
        assert!(matches!(err, Error::ClosedHandle(id) if id.name() == "w"));
    }

    #[tokio::test]
    async fn finish_returns_descriptor() {
        let storage = storage().await;
        let mut writer = storage.blobs().open_writer(&descriptor("w")).await.unwrap();
        writer.write("abc").await.unwrap();
        let stored = writer.finish().await.unwrap();
        assert_eq!(stored.size, Some(3));

        let mut writer = storage.blobs().open_writer(&descriptor("x")).await.unwrap();
        writer.abort().await.unwrap();
        assert!(matches!(writer.finish().await, Err(Error::ClosedHandle(_))));
    }

    #[tokio::test]
    async fn failed_write_never_publishes() {
        let mock = Arc::new(MockBackend::new().with_failing_writes());
        mock.seed_bucket("b").await;
        let storage = Storage::from_backend(mock.clone());

        let mut writer = storage.blobs().open_writer(&descriptor("w")).await.unwrap();
        assert!(writer.write(b"important payload").await.unwrap_err().is_backend());
        assert!(mock.aborted());
        assert!(writer.is_closed());

        assert!(matches!(writer.write(b"more").await, Err(Error::ClosedHandle(_))));
        assert!(matches!(writer.close().await, Err(Error::ClosedHandle(_))));
        writer.abort().await.unwrap();
        assert!(matches!(writer.finish().await, Err(Error::ClosedHandle(_))));

        assert!(storage.blobs().get("gs://b/w").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn abort_discards_content() {
        let storage = storage().await;
        let mut writer = storage.blobs().open_writer(&descriptor("w")).await.unwrap();
        writer.write(vec![1u8; 64]).await.unwrap();
        writer.abort().await.unwrap();
        writer.abort().await.unwrap();

        assert!(writer.is_closed());
        assert!(writer.descriptor().is_none());
        assert!(storage.blobs().get("gs://b/w").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dropping_open_writer_discards_content() {
        let storage = storage().await;
        let mut writer = storage.blobs().open_writer(&descriptor("w")).await.unwrap();
        writer.write("never stored").await.unwrap();
        drop(writer);

        assert!(storage.blobs().get("gs://b/w").await.unwrap().is_none());
    }
}
