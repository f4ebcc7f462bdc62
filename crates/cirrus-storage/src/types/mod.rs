//! Value records exchanged with the storage backend.
//!
//! Every record here is immutable once built: operations return fresh values
//! instead of mutating the ones passed in.

mod blob;
mod bucket;
mod listing;

pub use blob::{BlobDescriptor, BlobMetadata};
pub use bucket::{BucketDescriptor, StorageClass};
pub use listing::ListingPage;
