//! Whole-object transfers between local files, memory and storage.

use std::path::Path;

use bytes::Bytes;
use futures::TryStreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{Span, error, info, instrument, warn};

use crate::io::BlobWriter;
use crate::types::{BlobDescriptor, BlobMetadata};
use crate::uri::BlobAddress;
use crate::{Result, Storage, TRACING_TARGET_TRANSFER};

/// Size of the chunks read from local files.
const FILE_CHUNK_SIZE: usize = 256 * 1024;

/// Metadata applied by [`copy_file_to_storage`] when none is given.
pub fn default_upload_metadata() -> BlobMetadata {
    BlobMetadata::new()
        .with_content_type("application/json")
        .with_content_encoding("UTF-8")
}

/// Uploads a local file.
///
/// Without `metadata` the object is stored as UTF-8 encoded
/// `application/json`. Explicit metadata replaces those defaults entirely,
/// so unset fields stay unset.
///
/// If anything fails midway the upload is aborted, leaving any previous
/// object at `destination` untouched, and the file is closed before the
/// error is returned.
#[instrument(
    skip_all,
    target = TRACING_TARGET_TRANSFER,
    fields(path = %path.as_ref().display(), blob = tracing::field::Empty)
)]
pub async fn copy_file_to_storage(
    storage: &Storage,
    path: impl AsRef<Path>,
    destination: impl Into<BlobAddress>,
    metadata: Option<BlobMetadata>,
) -> Result<BlobDescriptor> {
    let path = path.as_ref();
    let id = destination.into().resolve()?;
    Span::current().record("blob", tracing::field::display(&id));

    let metadata = metadata.unwrap_or_else(default_upload_metadata);
    let descriptor = BlobDescriptor::new(id).with_metadata(metadata);

    let start = std::time::Instant::now();
    let file = File::open(path).await.inspect_err(|e| {
        error!(
            target: TRACING_TARGET_TRANSFER,
            path = %path.display(),
            error = %e,
            "Failed to open local file"
        );
    })?;
    let mut writer = storage.blobs().open_writer(&descriptor).await?;

    match pump_file(file, &mut writer).await {
        Ok(()) => {
            let stored = writer.finish().await?;
            info!(
                target: TRACING_TARGET_TRANSFER,
                path = %path.display(),
                blob = %stored.id,
                size = ?stored.size,
                elapsed = ?start.elapsed(),
                "File uploaded successfully"
            );
            Ok(stored)
        }
        Err(e) => {
            error!(
                target: TRACING_TARGET_TRANSFER,
                path = %path.display(),
                blob = %descriptor.id,
                written = writer.written(),
                error = %e,
                elapsed = ?start.elapsed(),
                "File upload failed, aborting"
            );
            if let Err(abort) = writer.abort().await {
                warn!(
                    target: TRACING_TARGET_TRANSFER,
                    blob = %descriptor.id,
                    error = %abort,
                    "Failed to abort upload"
                );
            }
            Err(e)
        }
    }
}

/// Copies every chunk of `file` into `writer`; the file is dropped on return.
async fn pump_file(file: File, writer: &mut BlobWriter) -> Result<()> {
    let mut chunks = ReaderStream::with_capacity(file, FILE_CHUNK_SIZE);
    while let Some(chunk) = chunks.try_next().await? {
        writer.write_bytes(chunk).await?;
    }
    Ok(())
}

/// Downloads an object into a local file, creating or truncating it.
///
/// Returns the number of bytes written. The reader is closed on every path.
#[instrument(
    skip_all,
    target = TRACING_TARGET_TRANSFER,
    fields(path = %path.as_ref().display(), blob = tracing::field::Empty)
)]
pub async fn copy_storage_to_file(
    storage: &Storage,
    source: impl Into<BlobAddress>,
    path: impl AsRef<Path>,
) -> Result<u64> {
    let path = path.as_ref();
    let id = source.into().resolve()?;
    Span::current().record("blob", tracing::field::display(&id));

    let start = std::time::Instant::now();
    let mut reader = storage.blobs().open_reader(&id).await?;

    let result: Result<u64> = async {
        let mut file = File::create(path).await?;
        let mut written = 0u64;
        while let Some(chunk) = reader.read_chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(written)
    }
    .await;
    reader.close();

    match &result {
        Ok(written) => info!(
            target: TRACING_TARGET_TRANSFER,
            blob = %id,
            path = %path.display(),
            size = written,
            elapsed = ?start.elapsed(),
            "Blob downloaded successfully"
        ),
        Err(e) => error!(
            target: TRACING_TARGET_TRANSFER,
            blob = %id,
            path = %path.display(),
            error = %e,
            elapsed = ?start.elapsed(),
            "Blob download failed"
        ),
    }

    result
}

/// Stores an in-memory buffer in a single request.
///
/// Unlike [`copy_file_to_storage`] no metadata defaults are applied.
pub async fn upload_bytes(
    storage: &Storage,
    destination: impl Into<BlobAddress>,
    content: impl Into<Bytes>,
    metadata: Option<BlobMetadata>,
) -> Result<BlobDescriptor> {
    let id = destination.into().resolve()?;
    let descriptor = BlobDescriptor::new(id).with_metadata(metadata.unwrap_or_default());
    storage.blobs().put(&descriptor, content.into()).await
}

/// Reads a whole object into memory.
pub async fn download_bytes(storage: &Storage, source: impl Into<BlobAddress>) -> Result<Bytes> {
    let mut reader = storage.blobs().open_reader(source).await?;
    let result = reader.read_to_end().await;
    reader.close();
    result.map(Bytes::from)
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::backend::mock::MockBackend;
    use crate::{BucketDescriptor, Error};

    async fn storage() -> Storage {
        let storage = Storage::memory();
        storage
            .buckets()
            .create(&BucketDescriptor::new("b"))
            .await
            .unwrap();
        storage
    }

    fn temp_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn upload_defaults_to_json() {
        let storage = storage().await;
        let file = temp_file(br#"{"hello":"world"}"#);

        let stored = copy_file_to_storage(&storage, file.path(), "gs://b/out.json", None)
            .await
            .unwrap();
        assert_eq!(stored.metadata.content_type.as_deref(), Some("application/json"));
        assert_eq!(stored.metadata.content_encoding.as_deref(), Some("UTF-8"));
        assert_eq!(stored.size, Some(17));

        let content = download_bytes(&storage, "gs://b/out.json").await.unwrap();
        assert_eq!(content, br#"{"hello":"world"}"#.as_slice());
    }

    #[tokio::test]
    async fn explicit_metadata_replaces_defaults() {
        let storage = storage().await;
        let file = temp_file(b"a,b\n1,2\n");
        let metadata = BlobMetadata::new().with_content_type("text/csv");

        let stored = copy_file_to_storage(&storage, file.path(), "gs://b/data.csv", Some(metadata))
            .await
            .unwrap();
        assert_eq!(stored.metadata.content_type.as_deref(), Some("text/csv"));
        assert_eq!(stored.metadata.content_encoding, None);
    }

    #[tokio::test]
    async fn large_file_round_trips() {
        let storage = storage().await;
        let content: Vec<u8> = (0..FILE_CHUNK_SIZE * 3 + 17).map(|i| (i % 251) as u8).collect();
        let file = temp_file(&content);

        copy_file_to_storage(&storage, file.path(), "gs://b/big.bin", None)
            .await
            .unwrap();

        let target = tempfile::tempdir().unwrap();
        let path = target.path().join("big.bin");
        let written = copy_storage_to_file(&storage, "gs://b/big.bin", &path)
            .await
            .unwrap();
        assert_eq!(written, content.len() as u64);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), content);
    }

    #[tokio::test]
    async fn missing_local_file_fails_before_upload() {
        let storage = storage().await;
        let dir = tempfile::tempdir().unwrap();

        let err = copy_file_to_storage(&storage, dir.path().join("absent"), "gs://b/x", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(storage.blobs().get("gs://b/x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_upload_is_aborted() {
        let mock = Arc::new(MockBackend::new().with_failing_writes());
        mock.seed_bucket("b").await;
        let storage = Storage::from_backend(mock.clone());
        let file = temp_file(b"payload");

        let err = copy_file_to_storage(&storage, file.path(), "gs://b/x", None)
            .await
            .unwrap_err();
        assert!(err.is_backend());
        assert!(mock.aborted());
        assert!(storage.blobs().get("gs://b/x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn download_of_missing_blob_fails() {
        let storage = storage().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never");

        let err = copy_storage_to_file(&storage, "gs://b/none", &path)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound(_)));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn upload_bytes_keeps_metadata_as_given() {
        let storage = storage().await;
        let stored = upload_bytes(&storage, "gs://b/raw", "raw bytes", None)
            .await
            .unwrap();
        assert!(stored.metadata.is_empty());
        assert_eq!(
            download_bytes(&storage, "gs://b/raw").await.unwrap(),
            "raw bytes"
        );
    }
}
