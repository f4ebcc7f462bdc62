//! Backend abstraction over the object storage service.
//!
//! [`Backend`] is the seam between the option-mapping layer and whatever
//! actually stores bytes. Implementations report "not found" on lookups as
//! `None`/`false` and surface every other failure unmodified.

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::types::{BlobDescriptor, BucketDescriptor, ListingPage};
use crate::uri::BlobId;
use crate::{ListOptions, Result};

#[cfg(feature = "gcs")]
#[cfg_attr(docsrs, doc(cfg(feature = "gcs")))]
mod gcs;
#[cfg(feature = "memory")]
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
mod memory;
#[cfg(all(test, feature = "memory"))]
pub(crate) mod mock;

#[cfg(feature = "gcs")]
pub use gcs::GcsBackend;
#[cfg(feature = "memory")]
pub use memory::MemoryBackend;

/// Stream of object content chunks.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

/// Bucket and object calls issued against a storage service.
#[async_trait::async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Looks up a bucket, `None` when it does not exist.
    async fn get_bucket(&self, name: &str) -> Result<Option<BucketDescriptor>>;

    /// Creates a bucket; fails with [`Error::BucketExists`] on a name clash.
    ///
    /// [`Error::BucketExists`]: crate::Error::BucketExists
    async fn create_bucket(&self, bucket: &BucketDescriptor) -> Result<BucketDescriptor>;

    /// Deletes an empty bucket, `false` when it does not exist.
    async fn delete_bucket(&self, name: &str) -> Result<bool>;

    /// Looks up an object, `None` when it does not exist.
    async fn get_object(&self, id: &BlobId) -> Result<Option<BlobDescriptor>>;

    /// Stores `content` with the descriptor's metadata, replacing any object
    /// of the same name.
    async fn create_object(
        &self,
        descriptor: &BlobDescriptor,
        content: Bytes,
    ) -> Result<BlobDescriptor>;

    /// Deletes an object, `false` when it does not exist.
    async fn delete_object(&self, id: &BlobId) -> Result<bool>;

    /// Copies an object server-side and returns once the copy is complete.
    async fn copy_object(&self, source: &BlobId, target: &BlobId) -> Result<BlobDescriptor>;

    /// Returns one page of a bucket listing.
    async fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<ListingPage>;

    /// Opens the object's content for sequential reading.
    async fn open_read(&self, id: &BlobId) -> Result<ByteStream>;

    /// Starts an upload whose content becomes visible on [`ObjectSink::finish`].
    async fn open_write(&self, descriptor: &BlobDescriptor) -> Result<Box<dyn ObjectSink>>;
}

/// Destination of a streaming upload.
///
/// Dropping a sink without finishing it discards the upload.
#[async_trait::async_trait]
pub trait ObjectSink: Send {
    /// Appends a chunk.
    async fn write(&mut self, chunk: Bytes) -> Result<()>;

    /// Completes the upload and returns the stored object.
    async fn finish(self: Box<Self>) -> Result<BlobDescriptor>;

    /// Discards everything written so far.
    async fn abort(self: Box<Self>) -> Result<()>;
}

/// Splits the names under `prefix` into direct entries and common prefixes
/// one level down.
///
/// Returns `None` for names that stay listed as-is, or the collapsed
/// directory prefix (with its trailing `/`) otherwise.
pub(crate) fn directory_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?;
    let end = rest.find('/')?;
    Some(&name[..prefix.len() + end + 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_nested_names() {
        assert_eq!(directory_prefix("a/b/c.txt", ""), Some("a/"));
        assert_eq!(directory_prefix("a/b/c.txt", "a/"), Some("a/b/"));
        assert_eq!(directory_prefix("a/c.txt", "a/"), None);
        assert_eq!(directory_prefix("top.txt", ""), None);
        assert_eq!(directory_prefix("a/b/", "a/"), Some("a/b/"));
        assert_eq!(directory_prefix("b/c", "a/"), None);
    }
}
