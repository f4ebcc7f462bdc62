//! Sequential read and write handles over stored objects.
//!
//! Both handles move from open to closed exactly once. Closing is
//! idempotent, and any read or write on a closed handle fails with
//! [`Error::ClosedHandle`](crate::Error::ClosedHandle).

mod reader;
mod writer;

pub use reader::BlobReader;
pub use writer::BlobWriter;
