//! Error types for storage operations.

use crate::uri::BlobId;

/// Specialized [`Result`] type for storage operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for bucket, blob and streaming operations.
///
/// Backend failures are surfaced as-is: this crate performs no retries and
/// never suppresses an error. The single exception is "not found" on a
/// lookup, which operations turn into an explicit `None`.
#[derive(Debug, thiserror::Error)]
#[must_use = "errors should be handled appropriately"]
pub enum Error {
    /// The address does not start with the `gs://` scheme.
    #[error("invalid scheme in '{uri}', expected 'gs://bucket/name'")]
    InvalidScheme {
        /// The original input.
        uri: String,
    },

    /// The address has the right scheme but lacks a bucket or object name.
    #[error("invalid storage uri '{uri}': {reason}")]
    InvalidUri {
        /// The original input.
        uri: String,
        /// What is missing.
        reason: &'static str,
    },

    /// A recognised option carried a value of the wrong shape.
    #[error("invalid {target} option: {reason}")]
    InvalidOption {
        /// The option set being translated (`bucket`, `blob`, `list`).
        target: &'static str,
        /// Deserializer message naming the offending value.
        reason: String,
    },

    /// The bucket name is already taken.
    #[error("bucket '{0}' already exists")]
    BucketExists(String),

    /// The backend refused to delete a bucket that still holds objects.
    #[error("bucket '{0}' is not empty")]
    BucketNotEmpty(String),

    /// The bucket does not exist.
    #[error("bucket '{0}' not found")]
    BucketNotFound(String),

    /// The object does not exist.
    #[error("object '{0}' not found")]
    ObjectNotFound(BlobId),

    /// A read or write was attempted on a released streaming handle.
    #[error("stream handle for '{0}' is closed")]
    ClosedHandle(BlobId),

    /// Invalid or incomplete service configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport, permission or quota failure reported by the backend.
    #[error("backend error{}: {message}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    Backend {
        /// HTTP status code, when the backend speaks HTTP.
        status: Option<u16>,
        /// Message reported by the backend.
        message: String,
    },

    /// Local I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP client failed before a response was received.
    #[cfg(feature = "gcs")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The in-process object store failed.
    #[cfg(feature = "memory")]
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Creates a new backend error without an HTTP status.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            status: None,
            message: message.into(),
        }
    }

    /// Creates a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns whether this error reports a missing bucket or object.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::BucketNotFound(_) | Self::ObjectNotFound(_) => true,
            Self::Backend { status, .. } => *status == Some(404),
            _ => false,
        }
    }

    /// Returns whether this error reports a conflict with existing state.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::BucketExists(_) | Self::BucketNotEmpty(_))
    }

    /// Returns whether this error originated in the backend or its transport.
    pub fn is_backend(&self) -> bool {
        match self {
            Self::Backend { .. } => true,
            #[cfg(feature = "gcs")]
            Self::Http(_) => true,
            #[cfg(feature = "memory")]
            Self::ObjectStore(_) => true,
            _ => false,
        }
    }
}
