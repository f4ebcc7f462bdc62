//! Object lookup, creation, deletion, copy and listing.

use bytes::Bytes;
use tracing::{Span, debug, error, info, instrument};

use super::{Blob, Listing};
use crate::io::{BlobReader, BlobWriter};
use crate::options::{ListOptions, OptionMap};
use crate::types::{BlobDescriptor, ListingPage};
use crate::uri::{BlobAddress, BlobId, ListingAddress};
use crate::{Result, Storage, TRACING_TARGET_BLOBS};

/// Blob operations bound to a [`Storage`] handle.
///
/// Every method taking an address accepts a `gs://bucket/name` string or a
/// [`BlobId`], resolved once on entry.
#[derive(Debug, Clone)]
pub struct BlobOperations {
    storage: Storage,
}

impl BlobOperations {
    /// Creates blob operations for a storage handle.
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Looks up an object.
    ///
    /// A missing object is `Ok(None)`, not an error.
    #[instrument(skip_all, target = TRACING_TARGET_BLOBS, fields(blob = tracing::field::Empty))]
    pub async fn get(&self, address: impl Into<BlobAddress>) -> Result<Option<BlobDescriptor>> {
        let id = address.into().resolve()?;
        Span::current().record("blob", tracing::field::display(&id));

        let start = std::time::Instant::now();
        let result = self.storage.backend().get_object(&id).await;
        let elapsed = start.elapsed();

        match result {
            Ok(blob) => {
                debug!(
                    target: TRACING_TARGET_BLOBS,
                    blob = %id,
                    found = blob.is_some(),
                    elapsed = ?elapsed,
                    "Blob lookup completed"
                );
                Ok(blob)
            }
            Err(e) => {
                error!(
                    target: TRACING_TARGET_BLOBS,
                    blob = %id,
                    error = %e,
                    elapsed = ?elapsed,
                    "Failed to look up blob"
                );
                Err(e)
            }
        }
    }

    /// Creates a zero-length object carrying the descriptor's metadata.
    #[instrument(skip_all, target = TRACING_TARGET_BLOBS, fields(blob = %descriptor.id))]
    pub async fn create(&self, descriptor: &BlobDescriptor) -> Result<Blob> {
        let created = self.put(descriptor, Bytes::new()).await?;
        Ok(Blob::new(self.storage.clone(), created))
    }

    /// Creates a zero-length object with metadata from an option map.
    ///
    /// Recognized keys are `cache-control`, `content-disposition`,
    /// `content-encoding`, `content-language` and `content-type`.
    pub async fn create_with(
        &self,
        address: impl Into<BlobAddress>,
        options: &OptionMap,
    ) -> Result<Blob> {
        let id = address.into().resolve()?;
        let descriptor = BlobDescriptor::new(id).with_options(options)?;
        self.create(&descriptor).await
    }

    /// Stores `content` in one request, replacing any existing object.
    pub(crate) async fn put(
        &self,
        descriptor: &BlobDescriptor,
        content: Bytes,
    ) -> Result<BlobDescriptor> {
        let size = content.len();
        let start = std::time::Instant::now();
        let result = self
            .storage
            .backend()
            .create_object(descriptor, content)
            .await;
        let elapsed = start.elapsed();

        match result {
            Ok(created) => {
                info!(
                    target: TRACING_TARGET_BLOBS,
                    blob = %created.id,
                    size,
                    content_type = ?created.metadata.content_type,
                    elapsed = ?elapsed,
                    "Blob stored successfully"
                );
                Ok(created)
            }
            Err(e) => {
                error!(
                    target: TRACING_TARGET_BLOBS,
                    blob = %descriptor.id,
                    error = %e,
                    elapsed = ?elapsed,
                    "Failed to store blob"
                );
                Err(e)
            }
        }
    }

    /// Deletes an object.
    ///
    /// Returns `false` if the object did not exist.
    #[instrument(skip_all, target = TRACING_TARGET_BLOBS, fields(blob = tracing::field::Empty))]
    pub async fn delete(&self, address: impl Into<BlobAddress>) -> Result<bool> {
        let id = address.into().resolve()?;
        Span::current().record("blob", tracing::field::display(&id));

        let start = std::time::Instant::now();
        let result = self.storage.backend().delete_object(&id).await;
        let elapsed = start.elapsed();

        match result {
            Ok(deleted) => {
                info!(
                    target: TRACING_TARGET_BLOBS,
                    blob = %id,
                    deleted,
                    elapsed = ?elapsed,
                    "Blob deletion completed"
                );
                Ok(deleted)
            }
            Err(e) => {
                error!(
                    target: TRACING_TARGET_BLOBS,
                    blob = %id,
                    error = %e,
                    elapsed = ?elapsed,
                    "Failed to delete blob"
                );
                Err(e)
            }
        }
    }

    /// Copies an object server-side.
    ///
    /// Waits until the backend reports the copy as complete, which for large
    /// or cross-location objects may take several round trips.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`](crate::Error::ObjectNotFound) if the
    /// source does not exist.
    #[instrument(skip_all, target = TRACING_TARGET_BLOBS, fields(source = tracing::field::Empty, destination = tracing::field::Empty))]
    pub async fn copy(
        &self,
        source: impl Into<BlobAddress>,
        target: impl Into<BlobAddress>,
    ) -> Result<BlobDescriptor> {
        let source = source.into().resolve()?;
        let target = target.into().resolve()?;
        let span = Span::current();
        span.record("source", tracing::field::display(&source));
        span.record("destination", tracing::field::display(&target));

        let start = std::time::Instant::now();
        let result = self.storage.backend().copy_object(&source, &target).await;
        let elapsed = start.elapsed();

        match result {
            Ok(copied) => {
                info!(
                    target: TRACING_TARGET_BLOBS,
                    source = %source,
                    destination = %target,
                    size = ?copied.size,
                    elapsed = ?elapsed,
                    "Blob copied successfully"
                );
                Ok(copied)
            }
            Err(e) => {
                error!(
                    target: TRACING_TARGET_BLOBS,
                    source = %source,
                    destination = %target,
                    error = %e,
                    elapsed = ?elapsed,
                    "Failed to copy blob"
                );
                Err(e)
            }
        }
    }

    /// Copies a resolved blob and returns a handle on the copy.
    pub async fn copy_blob(&self, source: &Blob, target: impl Into<BlobAddress>) -> Result<Blob> {
        let copied = self.copy(source.id(), target).await?;
        Ok(Blob::new(self.storage.clone(), copied))
    }

    /// Returns a single page of a bucket listing.
    ///
    /// Continue with the page's `next_page_token` set as
    /// [`ListOptions::page_token`]; nothing is fetched in the background.
    #[instrument(skip_all, target = TRACING_TARGET_BLOBS, fields(bucket = %bucket))]
    pub async fn list(&self, bucket: &str, options: &ListOptions) -> Result<ListingPage> {
        let start = std::time::Instant::now();
        let result = self.storage.backend().list_objects(bucket, options).await;
        let elapsed = start.elapsed();

        match result {
            Ok(page) => {
                debug!(
                    target: TRACING_TARGET_BLOBS,
                    bucket = %bucket,
                    prefix = ?options.prefix,
                    count = page.len(),
                    has_more = page.has_more(),
                    elapsed = ?elapsed,
                    "Listed blobs"
                );
                Ok(page)
            }
            Err(e) => {
                error!(
                    target: TRACING_TARGET_BLOBS,
                    bucket = %bucket,
                    error = %e,
                    elapsed = ?elapsed,
                    "Failed to list blobs"
                );
                Err(e)
            }
        }
    }

    /// Returns a single page of a bucket listing configured by an option map.
    ///
    /// Recognized keys are `current-directory`, `page-size`, `page-token`,
    /// `prefix` and `versions`.
    pub async fn list_with(&self, bucket: &str, options: &OptionMap) -> Result<ListingPage> {
        let options = ListOptions::from_options(options)?;
        self.list(bucket, &options).await
    }

    /// Lists everything under a location as one lazy sequence.
    ///
    /// The location is `gs://bucket[/path]` or a `(bucket, path)` pair. A
    /// non-blank path becomes the listing prefix and replaces
    /// `options.prefix`; a blank one lists from the bucket root.
    pub fn ls(
        &self,
        location: impl Into<ListingAddress>,
        mut options: ListOptions,
    ) -> Result<Listing> {
        let location = location.into().resolve()?;
        if let Some(prefix) = location.prefix() {
            options.prefix = Some(prefix.to_owned());
        }

        Ok(Listing::new(
            self.storage.clone(),
            location.bucket().to_owned(),
            options,
        ))
    }

    /// Opens an object for sequential reading.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectNotFound`](crate::Error::ObjectNotFound) if the
    /// object does not exist.
    #[instrument(skip_all, target = TRACING_TARGET_BLOBS, fields(blob = tracing::field::Empty))]
    pub async fn open_reader(&self, address: impl Into<BlobAddress>) -> Result<BlobReader> {
        let id = address.into().resolve()?;
        Span::current().record("blob", tracing::field::display(&id));

        let stream = self.storage.backend().open_read(&id).await.inspect_err(|e| {
            error!(target: TRACING_TARGET_BLOBS, blob = %id, error = %e, "Failed to open reader");
        })?;

        debug!(target: TRACING_TARGET_BLOBS, blob = %id, "Opened reader");
        Ok(BlobReader::new(id, stream))
    }

    /// Opens a writer whose content replaces the object when closed.
    #[instrument(skip_all, target = TRACING_TARGET_BLOBS, fields(blob = %descriptor.id))]
    pub async fn open_writer(&self, descriptor: &BlobDescriptor) -> Result<BlobWriter> {
        let sink = self
            .storage
            .backend()
            .open_write(descriptor)
            .await
            .inspect_err(|e| {
                error!(
                    target: TRACING_TARGET_BLOBS,
                    blob = %descriptor.id,
                    error = %e,
                    "Failed to open writer"
                );
            })?;

        debug!(target: TRACING_TARGET_BLOBS, blob = %descriptor.id, "Opened writer");
        Ok(BlobWriter::new(descriptor.id.clone(), sink))
    }

    /// Opens a handle on an existing object.
    pub async fn blob(&self, address: impl Into<BlobAddress>) -> Result<Option<Blob>> {
        let descriptor = self.get(address).await?;
        Ok(descriptor.map(|descriptor| Blob::new(self.storage.clone(), descriptor)))
    }

    /// Returns a handle without contacting the backend.
    pub fn handle(&self, id: BlobId) -> Blob {
        Blob::new(self.storage.clone(), BlobDescriptor::new(id))
    }
}
