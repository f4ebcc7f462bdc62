//! Prelude module for commonly used types.
//!
//! This module re-exports the most commonly used types from this crate.
//! Import it with `use cirrus_storage::prelude::*;`.

pub use crate::backend::{Backend, ObjectSink};
pub use crate::coerce::{Record, ToRecord};
pub use crate::transfer::{
    copy_file_to_storage, copy_storage_to_file, download_bytes, upload_bytes,
};
pub use crate::{
    Blob, BlobAddress, BlobDescriptor, BlobId, BlobMetadata, BlobOperations, BlobReader,
    BlobWriter, BucketDescriptor, BucketOperations, BucketOptions, Error, ListOptions, Listing,
    ListingAddress, ListingPage, Location, OptionMap, Result, Storage, StorageClass,
    StorageConfig,
};
