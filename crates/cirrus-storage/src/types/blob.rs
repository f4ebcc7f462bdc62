//! Blob descriptors and content metadata.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::uri::BlobId;

/// Content metadata attached to an object.
///
/// All fields are optional. Unset fields are left to the backend defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BlobMetadata {
    /// `Cache-Control` header served with the object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<String>,
    /// `Content-Disposition` header served with the object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<String>,
    /// `Content-Encoding` header served with the object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,
    /// `Content-Language` header served with the object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_language: Option<String>,
    /// MIME type of the content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl BlobMetadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cache control directive.
    pub fn with_cache_control(mut self, value: impl Into<String>) -> Self {
        self.cache_control = Some(value.into());
        self
    }

    /// Sets the content disposition.
    pub fn with_content_disposition(mut self, value: impl Into<String>) -> Self {
        self.content_disposition = Some(value.into());
        self
    }

    /// Sets the content encoding.
    pub fn with_content_encoding(mut self, value: impl Into<String>) -> Self {
        self.content_encoding = Some(value.into());
        self
    }

    /// Sets the content language.
    pub fn with_content_language(mut self, value: impl Into<String>) -> Self {
        self.content_language = Some(value.into());
        self
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    /// Returns whether no field is set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Returns `self` with every field set in `other` taking its value.
    pub fn merge(self, other: &BlobMetadata) -> Self {
        Self {
            cache_control: other.cache_control.clone().or(self.cache_control),
            content_disposition: other
                .content_disposition
                .clone()
                .or(self.content_disposition),
            content_encoding: other.content_encoding.clone().or(self.content_encoding),
            content_language: other.content_language.clone().or(self.content_language),
            content_type: other.content_type.clone().or(self.content_type),
        }
    }
}

/// An object's identity, metadata and backend-owned state.
///
/// `size`, `generation`, `etag` and the timestamps are filled in by the
/// backend and ignored when the descriptor is used to create an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BlobDescriptor {
    /// Bucket and object name.
    #[serde(flatten)]
    pub id: BlobId,
    /// Content metadata.
    #[serde(flatten)]
    pub metadata: BlobMetadata,
    /// Content length in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Content generation, bumped on every overwrite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<i64>,
    /// Entity tag of the current content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Creation time of this generation, set by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    /// Last metadata update time, set by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
    /// Set on non-current versions returned by a versioned listing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Timestamp>,
    /// True only for prefix entries synthesized by a delimiter listing.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_directory: bool,
}

impl BlobDescriptor {
    /// Creates a descriptor with no metadata.
    pub fn new(id: BlobId) -> Self {
        Self {
            id,
            metadata: BlobMetadata::default(),
            size: None,
            generation: None,
            etag: None,
            created: None,
            updated: None,
            deleted: None,
            is_directory: false,
        }
    }

    /// Creates the synthetic entry for a common prefix.
    pub(crate) fn directory(id: BlobId) -> Self {
        Self {
            size: Some(0),
            is_directory: true,
            ..Self::new(id)
        }
    }

    /// Replaces the metadata.
    pub fn with_metadata(mut self, metadata: BlobMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.metadata.content_type = Some(content_type.into());
        self
    }

    /// Returns the bucket name.
    #[inline]
    pub fn bucket(&self) -> &str {
        self.id.bucket()
    }

    /// Returns the object name.
    #[inline]
    pub fn name(&self) -> &str {
        self.id.name()
    }

    /// Returns the content length, zero when unknown.
    pub fn len(&self) -> u64 {
        self.size.unwrap_or_default()
    }

    /// Returns whether the object has no content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
