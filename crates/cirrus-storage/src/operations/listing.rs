//! Lazy flattening of paged listings.

use futures::TryStreamExt;
use futures::stream::BoxStream;
use tracing::debug;

use crate::options::ListOptions;
use crate::types::BlobDescriptor;
use crate::{Result, Storage, TRACING_TARGET_BLOBS};

/// A listing of everything under a bucket prefix.
///
/// Nothing is fetched until [`Listing::stream`] is polled. Each call to
/// `stream` starts again from the first page, so a listing can be iterated
/// more than once and always reflects the bucket at the time of iteration.
#[derive(Debug, Clone)]
pub struct Listing {
    storage: Storage,
    bucket: String,
    options: ListOptions,
}

impl Listing {
    pub(crate) fn new(storage: Storage, bucket: String, options: ListOptions) -> Self {
        Self {
            storage,
            bucket,
            options,
        }
    }

    /// Returns the bucket being listed.
    #[inline]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the options each page request is made with.
    #[inline]
    pub fn options(&self) -> &ListOptions {
        &self.options
    }

    /// Streams every entry, requesting further pages as the stream is
    /// consumed.
    ///
    /// A failed page request ends the stream with that error.
    pub fn stream(&self) -> BoxStream<'static, Result<BlobDescriptor>> {
        let blobs = self.storage.blobs();
        let bucket = self.bucket.clone();
        let mut options = self.options.clone();

        Box::pin(async_stream::try_stream! {
            let mut pages = 0usize;
            loop {
                let page = blobs.list(&bucket, &options).await?;
                pages += 1;

                let next = page.next_page_token;
                for blob in page.blobs {
                    yield blob;
                }

                match next {
                    Some(token) => options.page_token = Some(token),
                    None => break,
                }
            }

            debug!(
                target: TRACING_TARGET_BLOBS,
                bucket = %bucket,
                pages,
                "Listing exhausted"
            );
        })
    }

    /// Collects every entry into memory.
    pub async fn collect(&self) -> Result<Vec<BlobDescriptor>> {
        self.stream().try_collect().await
    }
}
