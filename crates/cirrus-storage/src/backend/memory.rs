//! In-process backend on top of `object_store`'s in-memory store.
//!
//! Each bucket owns an [`InMemory`] store. Object names are kept verbatim by
//! mapping every name to a single URL-safe base64 path segment, since
//! `object_store` paths collapse empty segments and trailing slashes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use jiff::Timestamp;
use object_store::buffered::BufWriter;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, GetOptions, ObjectMeta, ObjectStore, PutOptions, PutPayload,
};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::{Backend, ByteStream, ObjectSink, directory_prefix};
use crate::types::{BlobDescriptor, BlobMetadata, BucketDescriptor, ListingPage};
use crate::uri::BlobId;
use crate::{Error, ListOptions, Result, TRACING_TARGET_BACKEND};

struct MemoryBucket {
    descriptor: BucketDescriptor,
    store: Arc<dyn ObjectStore>,
}

/// Backend that keeps buckets and objects in process memory.
///
/// Versioning is not emulated: listings with `versions` set return the live
/// generation of each object only.
#[derive(Default)]
pub struct MemoryBackend {
    buckets: RwLock<HashMap<String, MemoryBucket>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    async fn store(&self, bucket: &str) -> Option<Arc<dyn ObjectStore>> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket).map(|entry| entry.store.clone())
    }
}

impl fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryBackend").finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get_bucket(&self, name: &str) -> Result<Option<BucketDescriptor>> {
        let buckets = self.buckets.read().await;
        Ok(buckets.get(name).map(|entry| entry.descriptor.clone()))
    }

    async fn create_bucket(&self, bucket: &BucketDescriptor) -> Result<BucketDescriptor> {
        if bucket.name.is_empty() || bucket.name.contains('/') {
            return Err(Error::Backend {
                status: Some(400),
                message: format!("invalid bucket name '{}'", bucket.name),
            });
        }

        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(&bucket.name) {
            return Err(Error::BucketExists(bucket.name.clone()));
        }

        let now = Timestamp::now();
        let descriptor = BucketDescriptor {
            created: Some(now),
            updated: Some(now),
            ..bucket.clone()
        };

        buckets.insert(
            descriptor.name.clone(),
            MemoryBucket {
                descriptor: descriptor.clone(),
                store: Arc::new(InMemory::new()),
            },
        );

        tracing::trace!(
            target: TRACING_TARGET_BACKEND,
            bucket = %descriptor.name,
            "Registered in-memory bucket"
        );

        Ok(descriptor)
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool> {
        let mut buckets = self.buckets.write().await;
        let Some(entry) = buckets.get(name) else {
            return Ok(false);
        };

        let first = entry.store.list(None).next().await.transpose()?;
        if first.is_some() {
            return Err(Error::BucketNotEmpty(name.to_owned()));
        }

        buckets.remove(name);
        Ok(true)
    }

    async fn get_object(&self, id: &BlobId) -> Result<Option<BlobDescriptor>> {
        match self.store(id.bucket()).await {
            Some(store) => head(store.as_ref(), id).await,
            None => Ok(None),
        }
    }

    async fn create_object(
        &self,
        descriptor: &BlobDescriptor,
        content: Bytes,
    ) -> Result<BlobDescriptor> {
        let store = self
            .store(descriptor.bucket())
            .await
            .ok_or_else(|| Error::BucketNotFound(descriptor.bucket().to_owned()))?;

        let options = PutOptions {
            attributes: to_attributes(&descriptor.metadata),
            ..Default::default()
        };
        store
            .put_opts(&object_path(descriptor.name()), PutPayload::from(content), options)
            .await?;

        stored(store.as_ref(), &descriptor.id).await
    }

    async fn delete_object(&self, id: &BlobId) -> Result<bool> {
        let Some(store) = self.store(id.bucket()).await else {
            return Ok(false);
        };

        // InMemory deletes are idempotent, so existence is checked first.
        if head(store.as_ref(), id).await?.is_none() {
            return Ok(false);
        }

        store.delete(&object_path(id.name())).await?;
        Ok(true)
    }

    async fn copy_object(&self, source: &BlobId, target: &BlobId) -> Result<BlobDescriptor> {
        let source_store = self
            .store(source.bucket())
            .await
            .ok_or_else(|| Error::ObjectNotFound(source.clone()))?;
        let target_store = self
            .store(target.bucket())
            .await
            .ok_or_else(|| Error::BucketNotFound(target.bucket().to_owned()))?;

        let result = match source_store.get(&object_path(source.name())).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(Error::ObjectNotFound(source.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let options = PutOptions {
            attributes: result.attributes.clone(),
            ..Default::default()
        };
        let content = result.bytes().await?;
        target_store
            .put_opts(&object_path(target.name()), PutPayload::from(content), options)
            .await?;

        stored(target_store.as_ref(), target).await
    }

    async fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<ListingPage> {
        let store = self
            .store(bucket)
            .await
            .ok_or_else(|| Error::BucketNotFound(bucket.to_owned()))?;

        let prefix = options.prefix.as_deref().unwrap_or_default();
        let metas: Vec<ObjectMeta> = store.list(None).try_collect().await?;

        // `None` marks a directory entry synthesized from a common prefix.
        let mut entries: BTreeMap<String, Option<ObjectMeta>> = BTreeMap::new();
        for meta in metas {
            let Some(name) = object_name(&meta.location) else {
                continue;
            };
            if !name.starts_with(prefix) {
                continue;
            }

            if options.current_directory {
                if let Some(directory) = directory_prefix(&name, prefix) {
                    entries.entry(directory.to_owned()).or_insert(None);
                    continue;
                }
            }

            entries.insert(name, Some(meta));
        }

        let after = options
            .page_token
            .as_deref()
            .map(decode_page_token)
            .transpose()?;
        let page_size = options.effective_page_size() as usize;

        let mut remaining = entries
            .into_iter()
            .filter(|(name, _)| after.as_ref().is_none_or(|last| name > last));
        let page: Vec<_> = remaining.by_ref().take(page_size).collect();
        let has_more = remaining.next().is_some();

        let next_page_token = match (has_more, page.last()) {
            (true, Some((last, _))) => Some(encode_page_token(last)),
            _ => None,
        };

        let mut blobs = Vec::with_capacity(page.len());
        let mut prefixes = Vec::new();
        for (name, meta) in page {
            let id = BlobId::new(bucket, name.as_str())?;
            match meta {
                None => {
                    prefixes.push(name);
                    blobs.push(BlobDescriptor::directory(id));
                }
                Some(_) => {
                    // Skips objects removed since the scan.
                    if let Some(descriptor) = head(store.as_ref(), &id).await? {
                        blobs.push(descriptor);
                    }
                }
            }
        }

        Ok(ListingPage::new(blobs, next_page_token).with_prefixes(prefixes))
    }

    async fn open_read(&self, id: &BlobId) -> Result<ByteStream> {
        let store = self
            .store(id.bucket())
            .await
            .ok_or_else(|| Error::ObjectNotFound(id.clone()))?;

        match store.get(&object_path(id.name())).await {
            Ok(result) => Ok(result.into_stream().map_err(Error::from).boxed()),
            Err(object_store::Error::NotFound { .. }) => Err(Error::ObjectNotFound(id.clone())),
            Err(e) => Err(e.into()),
        }
    }

    async fn open_write(&self, descriptor: &BlobDescriptor) -> Result<Box<dyn ObjectSink>> {
        let store = self
            .store(descriptor.bucket())
            .await
            .ok_or_else(|| Error::BucketNotFound(descriptor.bucket().to_owned()))?;

        let writer = BufWriter::new(store.clone(), object_path(descriptor.name()))
            .with_attributes(to_attributes(&descriptor.metadata));

        Ok(Box::new(MemorySink {
            id: descriptor.id.clone(),
            store,
            writer,
        }))
    }
}

/// Buffered upload into an in-memory bucket.
struct MemorySink {
    id: BlobId,
    store: Arc<dyn ObjectStore>,
    writer: BufWriter,
}

#[async_trait::async_trait]
impl ObjectSink for MemorySink {
    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        self.writer.write_all(&chunk).await?;
        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<BlobDescriptor> {
        let mut sink = *self;
        sink.writer.shutdown().await?;
        stored(sink.store.as_ref(), &sink.id).await
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        let mut sink = *self;
        sink.writer.abort().await?;
        Ok(())
    }
}

fn object_path(name: &str) -> Path {
    Path::from(URL_SAFE_NO_PAD.encode(name))
}

fn object_name(path: &Path) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(path.as_ref()).ok()?;
    String::from_utf8(bytes).ok()
}

fn encode_page_token(last: &str) -> String {
    STANDARD.encode(last)
}

fn decode_page_token(token: &str) -> Result<String> {
    let invalid = || Error::InvalidOption {
        target: "list",
        reason: format!("malformed page token '{token}'"),
    };

    let bytes = STANDARD.decode(token).map_err(|_| invalid())?;
    String::from_utf8(bytes).map_err(|_| invalid())
}

fn to_attributes(metadata: &BlobMetadata) -> Attributes {
    let fields = [
        (Attribute::CacheControl, &metadata.cache_control),
        (Attribute::ContentDisposition, &metadata.content_disposition),
        (Attribute::ContentEncoding, &metadata.content_encoding),
        (Attribute::ContentLanguage, &metadata.content_language),
        (Attribute::ContentType, &metadata.content_type),
    ];

    let mut attributes = Attributes::new();
    for (key, value) in fields {
        if let Some(value) = value {
            attributes.insert(key, value.clone().into());
        }
    }
    attributes
}

fn from_attributes(attributes: &Attributes) -> BlobMetadata {
    let get = |key: Attribute| attributes.get(&key).map(|value| value.to_string());

    BlobMetadata {
        cache_control: get(Attribute::CacheControl),
        content_disposition: get(Attribute::ContentDisposition),
        content_encoding: get(Attribute::ContentEncoding),
        content_language: get(Attribute::ContentLanguage),
        content_type: get(Attribute::ContentType),
    }
}

fn describe(id: BlobId, meta: &ObjectMeta, attributes: &Attributes) -> BlobDescriptor {
    let modified = Timestamp::from_millisecond(meta.last_modified.timestamp_millis()).ok();

    BlobDescriptor {
        metadata: from_attributes(attributes),
        size: Some(meta.size),
        // InMemory etags are a monotonic counter.
        generation: meta.e_tag.as_deref().and_then(|tag| tag.parse().ok()),
        etag: meta.e_tag.clone(),
        created: modified,
        updated: modified,
        ..BlobDescriptor::new(id)
    }
}

async fn head(store: &dyn ObjectStore, id: &BlobId) -> Result<Option<BlobDescriptor>> {
    let options = GetOptions {
        head: true,
        ..Default::default()
    };

    match store.get_opts(&object_path(id.name()), options).await {
        Ok(result) => Ok(Some(describe(id.clone(), &result.meta, &result.attributes))),
        Err(object_store::Error::NotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Looks up an object that was just written.
async fn stored(store: &dyn ObjectStore, id: &BlobId) -> Result<BlobDescriptor> {
    head(store, id)
        .await?
        .ok_or_else(|| Error::ObjectNotFound(id.clone()))
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;

    async fn backend_with_bucket(name: &str) -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend
            .create_bucket(&BucketDescriptor::new(name))
            .await
            .unwrap();
        backend
    }

    fn id(bucket: &str, name: &str) -> BlobId {
        BlobId::new(bucket, name).unwrap()
    }

    async fn put(backend: &MemoryBackend, bucket: &str, name: &str, content: &'static str) {
        let descriptor = BlobDescriptor::new(id(bucket, name));
        backend
            .create_object(&descriptor, Bytes::from_static(content.as_bytes()))
            .await
            .unwrap();
    }

    async fn names(backend: &MemoryBackend, bucket: &str, options: &ListOptions) -> Vec<String> {
        let page = backend.list_objects(bucket, options).await.unwrap();
        page.blobs.into_iter().map(|b| b.id.name().to_owned()).collect()
    }

    #[tokio::test]
    async fn bucket_lifecycle() {
        let backend = MemoryBackend::new();
        assert!(backend.get_bucket("data").await.unwrap().is_none());

        let created = backend
            .create_bucket(&BucketDescriptor::new("data").with_location("EU"))
            .await
            .unwrap();
        assert!(created.created.is_some());
        assert_eq!(created.location.as_deref(), Some("EU"));

        let err = backend
            .create_bucket(&BucketDescriptor::new("data"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BucketExists(name) if name == "data"));

        assert!(backend.delete_bucket("data").await.unwrap());
        assert!(!backend.delete_bucket("data").await.unwrap());
    }

    #[tokio::test]
    async fn refuses_to_delete_non_empty_bucket() {
        let backend = backend_with_bucket("data").await;
        put(&backend, "data", "file.txt", "x").await;

        let err = backend.delete_bucket("data").await.unwrap_err();
        assert!(matches!(err, Error::BucketNotEmpty(_)));
        assert!(backend.get_bucket("data").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn object_names_are_kept_verbatim() {
        let backend = backend_with_bucket("b").await;
        put(&backend, "b", "dir//odd name/", "x").await;

        let descriptor = backend
            .get_object(&id("b", "dir//odd name/"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(descriptor.id.name(), "dir//odd name/");
        assert_eq!(descriptor.size, Some(1));
    }

    #[tokio::test]
    async fn metadata_survives_copy() {
        let backend = backend_with_bucket("src").await;
        backend
            .create_bucket(&BucketDescriptor::new("dst"))
            .await
            .unwrap();

        let descriptor = BlobDescriptor::new(id("src", "a.json"))
            .with_metadata(BlobMetadata::new().with_content_type("application/json"));
        backend
            .create_object(&descriptor, Bytes::from_static(b"{}"))
            .await
            .unwrap();

        let copied = backend
            .copy_object(&id("src", "a.json"), &id("dst", "b.json"))
            .await
            .unwrap();
        assert_eq!(copied.id, id("dst", "b.json"));
        assert_eq!(
            copied.metadata.content_type.as_deref(),
            Some("application/json")
        );
        assert_eq!(copied.size, Some(2));

        let err = backend
            .copy_object(&id("src", "missing"), &id("dst", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ObjectNotFound(_)));
    }

    #[tokio::test]
    async fn delete_reports_existence() {
        let backend = backend_with_bucket("b").await;
        put(&backend, "b", "k", "v").await;

        assert!(backend.delete_object(&id("b", "k")).await.unwrap());
        assert!(!backend.delete_object(&id("b", "k")).await.unwrap());
        assert!(!backend.delete_object(&id("nope", "k")).await.unwrap());
    }

    #[tokio::test]
    async fn listing_filters_by_raw_prefix() {
        let backend = backend_with_bucket("b").await;
        for name in ["a/1", "a/2", "ab", "b/1"] {
            put(&backend, "b", name, "x").await;
        }

        let options = ListOptions::new().with_prefix("a/");
        assert_eq!(names(&backend, "b", &options).await, ["a/1", "a/2"]);

        let options = ListOptions::new().with_prefix("a");
        assert_eq!(names(&backend, "b", &options).await, ["a/1", "a/2", "ab"]);
    }

    #[tokio::test]
    async fn current_directory_folds_nested_names() {
        let backend = backend_with_bucket("b").await;
        for name in ["top", "a/1", "a/deep/2", "c/3"] {
            put(&backend, "b", name, "x").await;
        }

        let options = ListOptions::new().with_current_directory(true);
        let page = backend.list_objects("b", &options).await.unwrap();
        let listed: Vec<_> = page
            .blobs
            .iter()
            .map(|b| (b.id.name(), b.is_directory))
            .collect();
        assert_eq!(listed, [("a/", true), ("c/", true), ("top", false)]);
        assert_eq!(page.prefixes, ["a/", "c/"]);

        let options = options.with_prefix("a/");
        assert_eq!(names(&backend, "b", &options).await, ["a/1", "a/deep/"]);
    }

    #[tokio::test]
    async fn pagination_walks_every_entry() {
        let backend = backend_with_bucket("b").await;
        for name in ["1", "2", "3", "4", "5"] {
            put(&backend, "b", name, "x").await;
        }

        let mut options = ListOptions::new().with_page_size(NonZeroU32::new(2).unwrap());
        let mut seen = Vec::new();
        loop {
            let page = backend.list_objects("b", &options).await.unwrap();
            seen.extend(page.blobs.iter().map(|b| b.id.name().to_owned()));
            match page.next_page_token {
                Some(token) => options = options.with_page_token(token),
                None => break,
            }
        }
        assert_eq!(seen, ["1", "2", "3", "4", "5"]);
    }

    #[tokio::test]
    async fn malformed_page_token_is_rejected() {
        let backend = backend_with_bucket("b").await;
        let options = ListOptions::new().with_page_token("%%%");
        let err = backend.list_objects("b", &options).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOption { target: "list", .. }));
    }

    #[tokio::test]
    async fn listing_missing_bucket_fails() {
        let backend = MemoryBackend::new();
        let err = backend
            .list_objects("ghost", &ListOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BucketNotFound(_)));
    }

    #[tokio::test]
    async fn sink_publishes_on_finish_only() {
        let backend = backend_with_bucket("b").await;
        let descriptor = BlobDescriptor::new(id("b", "stream.bin")).with_content_type("text/plain");

        let mut sink = backend.open_write(&descriptor).await.unwrap();
        sink.write(Bytes::from_static(b"hello ")).await.unwrap();
        sink.write(Bytes::from_static(b"world")).await.unwrap();
        assert!(backend.get_object(&descriptor.id).await.unwrap().is_none());

        let stored = sink.finish().await.unwrap();
        assert_eq!(stored.size, Some(11));
        assert_eq!(stored.metadata.content_type.as_deref(), Some("text/plain"));

        let chunks: Vec<Bytes> = backend
            .open_read(&descriptor.id)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(chunks.concat(), b"hello world");
    }

    #[tokio::test]
    async fn aborted_sink_leaves_nothing() {
        let backend = backend_with_bucket("b").await;
        let descriptor = BlobDescriptor::new(id("b", "partial"));

        let mut sink = backend.open_write(&descriptor).await.unwrap();
        sink.write(Bytes::from_static(b"data")).await.unwrap();
        sink.abort().await.unwrap();

        assert!(backend.get_object(&descriptor.id).await.unwrap().is_none());
    }
}
