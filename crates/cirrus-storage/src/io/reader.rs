use std::fmt;

use bytes::{Buf, Bytes, BytesMut};
use futures::StreamExt;

use crate::backend::ByteStream;
use crate::uri::BlobId;
use crate::{Error, Result, TRACING_TARGET_BLOBS};

/// Sequential reader over an object's content.
///
/// Obtained from [`BlobOperations::open_reader`](crate::BlobOperations::open_reader)
/// or [`Blob::reader`](crate::Blob::reader).
pub struct BlobReader {
    id: BlobId,
    stream: Option<ByteStream>,
    /// Bytes received but not yet handed out by [`BlobReader::read`].
    pending: Bytes,
    position: u64,
}

impl BlobReader {
    pub(crate) fn new(id: BlobId, stream: ByteStream) -> Self {
        Self {
            id,
            stream: Some(stream),
            pending: Bytes::new(),
            position: 0,
        }
    }

    /// Returns the object being read.
    #[inline]
    pub fn id(&self) -> &BlobId {
        &self.id
    }

    /// Returns the number of bytes handed out so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns whether the reader has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Pulls the next non-empty chunk from the backend stream.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Error::ClosedHandle(self.id.clone()))?;

        while let Some(chunk) = stream.next().await.transpose()? {
            if !chunk.is_empty() {
                return Ok(Some(chunk));
            }
        }
        Ok(None)
    }

    /// Returns the next chunk as delivered by the backend, or `None` at the
    /// end of the object.
    pub async fn read_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.stream.is_none() {
            return Err(Error::ClosedHandle(self.id.clone()));
        }

        let chunk = if self.pending.is_empty() {
            self.next_chunk().await?
        } else {
            Some(std::mem::take(&mut self.pending))
        };
        if let Some(chunk) = &chunk {
            self.position += chunk.len() as u64;
        }
        Ok(chunk)
    }

    /// Reads up to `buf.len()` bytes, returning `0` at the end of the object.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.stream.is_none() {
            return Err(Error::ClosedHandle(self.id.clone()));
        }
        if buf.is_empty() {
            return Ok(0);
        }

        if self.pending.is_empty() {
            match self.next_chunk().await? {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }

        let count = buf.len().min(self.pending.len());
        buf[..count].copy_from_slice(&self.pending[..count]);
        self.pending.advance(count);
        self.position += count as u64;
        Ok(count)
    }

    /// Reads the remainder of the object.
    pub async fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let mut content = BytesMut::new();
        while let Some(chunk) = self.read_chunk().await? {
            content.extend_from_slice(&chunk);
        }
        Ok(content.to_vec())
    }

    /// Releases the underlying stream. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            self.pending.clear();
            tracing::trace!(
                target: TRACING_TARGET_BLOBS,
                blob = %self.id,
                bytes_read = self.position,
                "Closed reader"
            );
        }
    }
}

impl fmt::Debug for BlobReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobReader")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    fn reader(chunks: &[&'static [u8]]) -> BlobReader {
        let chunks: Vec<Result<Bytes>> = chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
        BlobReader::new(
            BlobId::new("bucket", "object").unwrap(),
            stream::iter(chunks).boxed(),
        )
    }

    #[tokio::test]
    async fn read_spans_chunks() {
        let mut reader = reader(&[b"abc", b"", b"defg"]);
        let mut buf = [0u8; 2];

        let mut collected = Vec::new();
        loop {
            let n = reader.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }

        assert_eq!(collected, b"abcdefg");
        assert_eq!(reader.position(), 7);
    }

    #[tokio::test]
    async fn chunk_after_partial_read_returns_remainder() {
        let mut reader = reader(&[b"hello", b"world"]);
        let mut buf = [0u8; 3];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 3);

        assert_eq!(reader.read_chunk().await.unwrap().unwrap(), "lo");
        assert_eq!(reader.read_to_end().await.unwrap(), b"world");
        assert_eq!(reader.read_chunk().await.unwrap(), None);
    }

    #[tokio::test]
    async fn double_close_is_fine() {
        let mut reader = reader(&[b"data"]);
        reader.close();
        reader.close();
        assert!(reader.is_closed());
    }

    #[tokio::test]
    async fn read_after_close_fails() {
        let mut reader = reader(&[b"data"]);
        reader.close();

        let mut buf = [0u8; 4];
        assert!(matches!(
            reader.read(&mut buf).await,
            Err(Error::ClosedHandle(_))
        ));
        assert!(matches!(
            reader.read_chunk().await,
            Err(Error::ClosedHandle(_))
        ));
        assert!(matches!(
            reader.read_to_end().await,
            Err(Error::ClosedHandle(_))
        ));
    }

    #[tokio::test]
    async fn stream_errors_surface() {
        let chunks: Vec<Result<Bytes>> = vec![
            Ok(Bytes::from_static(b"ok")),
            Err(Error::backend("connection reset")),
        ];
        let mut reader = BlobReader::new(
            BlobId::new("bucket", "object").unwrap(),
            stream::iter(chunks).boxed(),
        );

        assert!(reader.read_chunk().await.unwrap().is_some());
        assert!(reader.read_chunk().await.unwrap_err().is_backend());
    }
}
