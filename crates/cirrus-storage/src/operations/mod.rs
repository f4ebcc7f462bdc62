//! Bucket and blob operations.
//!
//! Operations are obtained from a [`Storage`](crate::Storage) handle and
//! translate caller options and addresses into backend calls, logging each
//! call with its outcome and duration.

mod blob;
mod blob_operations;
mod bucket_operations;
mod listing;

pub use blob::Blob;
pub use blob_operations::BlobOperations;
pub use bucket_operations::BucketOperations;
pub use listing::Listing;
