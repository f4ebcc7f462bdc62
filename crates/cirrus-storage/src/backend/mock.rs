//! Test backend that wraps [`MemoryBackend`] with injectable faults.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;

use super::{Backend, ByteStream, MemoryBackend, ObjectSink};
use crate::types::{BlobDescriptor, BucketDescriptor, ListingPage};
use crate::uri::BlobId;
use crate::{Error, ListOptions, Result};

/// Memory backend with switches for simulating races and failures.
#[derive(Debug, Default)]
pub(crate) struct MockBackend {
    inner: MemoryBackend,
    /// Number of upcoming bucket lookups that report the bucket as absent.
    stale_bucket_reads: AtomicUsize,
    /// Makes every sink write fail.
    fail_writes: AtomicBool,
    /// Set once a sink has been aborted.
    aborted: Arc<AtomicBool>,
    create_bucket_calls: AtomicUsize,
    list_calls: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stale_bucket_reads(self, count: usize) -> Self {
        self.stale_bucket_reads.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_failing_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    pub fn create_bucket_calls(&self) -> usize {
        self.create_bucket_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Seeds a bucket behind the caller's back.
    pub async fn seed_bucket(&self, name: &str) {
        self.inner
            .create_bucket(&BucketDescriptor::new(name))
            .await
            .unwrap();
    }
}

#[async_trait::async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_bucket(&self, name: &str) -> Result<Option<BucketDescriptor>> {
        let stale = self
            .stale_bucket_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            return Ok(None);
        }
        self.inner.get_bucket(name).await
    }

    async fn create_bucket(&self, bucket: &BucketDescriptor) -> Result<BucketDescriptor> {
        self.create_bucket_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_bucket(bucket).await
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool> {
        self.inner.delete_bucket(name).await
    }

    async fn get_object(&self, id: &BlobId) -> Result<Option<BlobDescriptor>> {
        self.inner.get_object(id).await
    }

    async fn create_object(
        &self,
        descriptor: &BlobDescriptor,
        content: Bytes,
    ) -> Result<BlobDescriptor> {
        self.inner.create_object(descriptor, content).await
    }

    async fn delete_object(&self, id: &BlobId) -> Result<bool> {
        self.inner.delete_object(id).await
    }

    async fn copy_object(&self, source: &BlobId, target: &BlobId) -> Result<BlobDescriptor> {
        self.inner.copy_object(source, target).await
    }

    async fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<ListingPage> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_objects(bucket, options).await
    }

    async fn open_read(&self, id: &BlobId) -> Result<ByteStream> {
        self.inner.open_read(id).await
    }

    async fn open_write(&self, descriptor: &BlobDescriptor) -> Result<Box<dyn ObjectSink>> {
        let sink = self.inner.open_write(descriptor).await?;
        if !self.fail_writes.load(Ordering::SeqCst) {
            return Ok(sink);
        }

        Ok(Box::new(FailingSink {
            inner: sink,
            aborted: self.aborted.clone(),
        }))
    }
}

struct FailingSink {
    inner: Box<dyn ObjectSink>,
    aborted: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl ObjectSink for FailingSink {
    async fn write(&mut self, _chunk: Bytes) -> Result<()> {
        Err(Error::Backend {
            status: Some(503),
            message: "injected write failure".to_owned(),
        })
    }

    async fn finish(self: Box<Self>) -> Result<BlobDescriptor> {
        self.inner.finish().await
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        self.aborted.store(true, Ordering::SeqCst);
        self.inner.abort().await
    }
}
