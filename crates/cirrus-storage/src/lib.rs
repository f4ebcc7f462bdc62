#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]
#![allow(clippy::result_large_err)]

// Tracing target constants for consistent logging
pub const TRACING_TARGET_CLIENT: &str = "cirrus_storage::client";
pub const TRACING_TARGET_BUCKETS: &str = "cirrus_storage::buckets";
pub const TRACING_TARGET_BLOBS: &str = "cirrus_storage::blobs";
pub const TRACING_TARGET_BACKEND: &str = "cirrus_storage::backend";
pub const TRACING_TARGET_TRANSFER: &str = "cirrus_storage::transfer";

pub mod backend;
mod client;
pub mod coerce;
mod config;
mod error;
pub mod io;
pub mod operations;
pub mod options;
pub mod prelude;
pub mod transfer;
pub mod types;
pub mod uri;

pub use crate::client::Storage;
pub use crate::config::{Provider, StorageConfig};
pub use crate::error::{Error, Result};
pub use crate::io::{BlobReader, BlobWriter};
pub use crate::operations::{Blob, BlobOperations, BucketOperations, Listing};
pub use crate::options::{BucketOptions, ListOptions, OptionMap};
pub use crate::types::{
    BlobDescriptor, BlobMetadata, BucketDescriptor, ListingPage, StorageClass,
};
pub use crate::uri::{BlobAddress, BlobId, ListingAddress, Location};
