//! Resumable upload sessions.

use bytes::{Bytes, BytesMut};
use reqwest::header::{CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};
use url::Url;

use super::wire::ObjectResource;
use super::{authorize, check};
use crate::backend::ObjectSink;
use crate::types::BlobDescriptor;
use crate::uri::BlobId;
use crate::{Error, Result, TRACING_TARGET_BACKEND};

/// Granularity the API requires for every chunk except the last.
const CHUNK_ALIGNMENT: usize = 256 * 1024;

/// Size of the chunks sent while the upload is in progress.
pub(super) const CHUNK_SIZE: usize = 32 * CHUNK_ALIGNMENT;

/// Status the API uses to acknowledge an intermediate chunk.
const RESUME_INCOMPLETE: u16 = 308;

/// Status the API returns for a cancelled session.
const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Sink that streams content into a resumable upload session.
pub(super) struct ResumableSink {
    http: Client,
    access_token: Option<String>,
    session: Url,
    id: BlobId,
    buffer: BytesMut,
    offset: u64,
}

impl ResumableSink {
    pub fn new(http: Client, access_token: Option<String>, session: Url, id: BlobId) -> Self {
        Self {
            http,
            access_token,
            session,
            id,
            buffer: BytesMut::with_capacity(CHUNK_SIZE),
            offset: 0,
        }
    }

    /// Sends `chunk` at the current offset; `total` is set on the last one.
    async fn send(&self, chunk: Bytes, total: Option<u64>) -> Result<reqwest::Response> {
        let range = content_range(self.offset, chunk.len() as u64, total);

        let request = self
            .http
            .put(self.session.clone())
            .header(CONTENT_LENGTH, chunk.len() as u64)
            .header(CONTENT_RANGE, range)
            .body(chunk);
        let response = authorize(request, self.access_token.as_deref())
            .send()
            .await?;

        Ok(response)
    }

    /// Moves the offset past what a 308 reply reports as persisted and
    /// returns the part of `chunk` the server did not keep.
    fn acknowledge(&mut self, chunk: Bytes, response: &reqwest::Response) -> Result<Bytes> {
        let persisted = response
            .headers()
            .get(RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(persisted_end)
            .map_or(0, |end| end + 1);

        let end = self.offset + chunk.len() as u64;
        if persisted <= self.offset || persisted > end {
            return Err(Error::Backend {
                status: Some(RESUME_INCOMPLETE),
                message: format!(
                    "upload session acknowledged {persisted} bytes after {end} were sent"
                ),
            });
        }

        let kept = (persisted - self.offset) as usize;
        self.offset = persisted;
        Ok(chunk.slice(kept..))
    }
}

#[async_trait::async_trait]
impl ObjectSink for ResumableSink {
    async fn write(&mut self, chunk: Bytes) -> Result<()> {
        self.buffer.extend_from_slice(&chunk);

        while self.buffer.len() >= CHUNK_SIZE {
            let part = self.buffer.split_to(CHUNK_SIZE).freeze();
            let response = self.send(part.clone(), None).await?;
            if response.status().as_u16() != RESUME_INCOMPLETE {
                check(response).await?;
                return Err(Error::backend(
                    "upload session finalized before all content was sent",
                ));
            }

            let unsent = self.acknowledge(part, &response)?;
            if !unsent.is_empty() {
                tracing::debug!(
                    target: TRACING_TARGET_BACKEND,
                    blob = %self.id,
                    offset = self.offset,
                    unsent = unsent.len(),
                    "Requeued unpersisted chunk tail"
                );

                let mut buffer = BytesMut::with_capacity(unsent.len() + self.buffer.len());
                buffer.extend_from_slice(&unsent);
                buffer.extend_from_slice(&self.buffer);
                self.buffer = buffer;
            }
        }

        Ok(())
    }

    async fn finish(self: Box<Self>) -> Result<BlobDescriptor> {
        let mut sink = *self;
        let mut last = sink.buffer.split().freeze();
        let total = sink.offset + last.len() as u64;

        let response = loop {
            let response = sink.send(last.clone(), Some(total)).await?;
            if response.status().as_u16() != RESUME_INCOMPLETE {
                break response;
            }
            last = sink.acknowledge(last, &response)?;
        };
        let resource: ObjectResource = check(response).await?.json().await?;

        tracing::debug!(
            target: TRACING_TARGET_BACKEND,
            blob = %sink.id,
            size = total,
            "Finalized resumable upload"
        );

        resource.into_descriptor()
    }

    async fn abort(self: Box<Self>) -> Result<()> {
        let request = self.http.delete(self.session.clone());
        let response = authorize(request, self.access_token.as_deref())
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::GONE => Ok(()),
            status if status.as_u16() == CLIENT_CLOSED_REQUEST => Ok(()),
            _ => check(response).await.map(|_| ()),
        }
    }
}

/// Formats the `Content-Range` header of a chunk.
fn content_range(offset: u64, len: u64, total: Option<u64>) -> String {
    let total = total.map_or_else(|| "*".to_owned(), |total| total.to_string());
    if len == 0 {
        format!("bytes */{total}")
    } else {
        format!("bytes {}-{}/{total}", offset, offset + len - 1)
    }
}

/// Parses the last persisted byte from a `Range: bytes=0-N` reply header.
fn persisted_end(range: &str) -> Option<u64> {
    range.trim().strip_prefix("bytes=0-")?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_range_formats() {
        assert_eq!(content_range(0, 262_144, None), "bytes 0-262143/*");
        assert_eq!(content_range(262_144, 10, Some(262_154)), "bytes 262144-262153/262154");
        assert_eq!(content_range(0, 0, Some(0)), "bytes */0");
    }

    #[test]
    fn persisted_range_parsing() {
        assert_eq!(persisted_end("bytes=0-4194303"), Some(4_194_303));
        assert_eq!(persisted_end("bytes=0-0"), Some(0));
        assert_eq!(persisted_end("bytes=10-20"), None);
        assert_eq!(persisted_end("garbage"), None);
    }

    #[test]
    fn chunk_size_is_aligned() {
        assert_eq!(CHUNK_SIZE % CHUNK_ALIGNMENT, 0);
    }
}
