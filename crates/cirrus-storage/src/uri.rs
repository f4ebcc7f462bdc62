//! Parsing of `gs://bucket/name` object addresses.
//!
//! An address is split on the first two runs of `/`: everything before the
//! first run is the scheme (which must be exactly `gs:`), the segment between
//! the runs is the bucket, and the remainder, slashes included, is the object
//! name.

use std::fmt;
use std::str::FromStr;

use derive_more::From;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Scheme token accepted by the resolver.
pub const SCHEME: &str = "gs";

/// Splits `input` into `(scheme, bucket, name)` on the first two `/` runs.
fn split_address(input: &str) -> (&str, Option<&str>, Option<&str>) {
    let Some(first) = input.find('/') else {
        return (input, None, None);
    };

    let scheme = &input[..first];
    let rest = input[first..].trim_start_matches('/');
    match rest.find('/') {
        Some(second) => {
            let name = rest[second..].trim_start_matches('/');
            (scheme, Some(&rest[..second]), Some(name))
        }
        None => (scheme, Some(rest), None),
    }
}

/// Validates the scheme part and returns the bucket and optional name.
fn resolve_parts(input: &str) -> Result<(&str, Option<&str>)> {
    let (scheme, bucket, name) = split_address(input);

    if scheme.strip_suffix(':') != Some(SCHEME) {
        return Err(Error::InvalidScheme {
            uri: input.to_owned(),
        });
    }

    match bucket {
        Some(bucket) if !bucket.is_empty() => Ok((bucket, name.filter(|n| !n.is_empty()))),
        _ => Err(Error::InvalidUri {
            uri: input.to_owned(),
            reason: "missing bucket name",
        }),
    }
}

/// Identifies an object within a bucket.
///
/// Both parts are always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawBlobId")]
pub struct BlobId {
    bucket: String,
    name: String,
}

impl BlobId {
    /// Creates an identifier from a bucket and object name.
    pub fn new(bucket: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        let name = name.into();

        if bucket.is_empty() || name.is_empty() {
            return Err(Error::InvalidUri {
                uri: format!("{SCHEME}://{bucket}/{name}"),
                reason: "bucket and object name are both required",
            });
        }

        if bucket.contains('/') {
            return Err(Error::InvalidUri {
                uri: format!("{SCHEME}://{bucket}/{name}"),
                reason: "bucket name must not contain '/'",
            });
        }

        Ok(Self { bucket, name })
    }

    /// Parses a `gs://bucket/name` address.
    pub fn parse(uri: &str) -> Result<Self> {
        let (bucket, name) = resolve_parts(uri)?;
        let name = name.ok_or_else(|| Error::InvalidUri {
            uri: uri.to_owned(),
            reason: "missing object name",
        })?;

        Ok(Self {
            bucket: bucket.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Returns the bucket name.
    #[inline]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the object name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the `gs://` form of this identifier.
    pub fn to_uri(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}://{}/{}", self.bucket, self.name)
    }
}

impl FromStr for BlobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[derive(Deserialize)]
struct RawBlobId {
    bucket: String,
    name: String,
}

impl TryFrom<RawBlobId> for BlobId {
    type Error = Error;

    fn try_from(raw: RawBlobId) -> Result<Self> {
        Self::new(raw.bucket, raw.name)
    }
}

/// An object address that is either still a URI or already resolved.
///
/// Public operations accept `impl Into<BlobAddress>` and normalize it once on
/// entry, so callers can pass `"gs://bucket/name"`, a `String`, or a
/// [`BlobId`] interchangeably.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum BlobAddress {
    /// An unparsed `gs://bucket/name` address.
    Uri(String),
    /// An identifier that needs no parsing.
    Resolved(BlobId),
}

impl BlobAddress {
    /// Normalizes this address into a [`BlobId`].
    pub fn resolve(self) -> Result<BlobId> {
        match self {
            Self::Uri(uri) => BlobId::parse(&uri),
            Self::Resolved(id) => Ok(id),
        }
    }
}

impl From<&str> for BlobAddress {
    fn from(uri: &str) -> Self {
        Self::Uri(uri.to_owned())
    }
}

impl From<&String> for BlobAddress {
    fn from(uri: &String) -> Self {
        Self::Uri(uri.clone())
    }
}

impl From<&BlobId> for BlobAddress {
    fn from(id: &BlobId) -> Self {
        Self::Resolved(id.clone())
    }
}

/// A bucket plus an optional name prefix, the target of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    bucket: String,
    prefix: Option<String>,
}

impl Location {
    /// Creates a location from a bucket and a path; a blank path means the
    /// bucket root.
    ///
    /// The bucket is validated when the location is resolved as a
    /// [`ListingAddress`].
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            bucket: bucket.into(),
            prefix: (!path.trim().is_empty()).then_some(path),
        }
    }

    /// Creates a location for the root of a bucket.
    pub fn root(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: None,
        }
    }

    /// Parses `gs://bucket` or `gs://bucket/prefix`.
    pub fn parse(uri: &str) -> Result<Self> {
        let (bucket, prefix) = resolve_parts(uri)?;
        Ok(Self {
            bucket: bucket.to_owned(),
            prefix: prefix
                .filter(|prefix| !prefix.trim().is_empty())
                .map(str::to_owned),
        })
    }

    /// Returns the bucket name.
    #[inline]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Returns the name prefix, if any.
    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{SCHEME}://{}/{}",
            self.bucket,
            self.prefix.as_deref().unwrap_or_default()
        )
    }
}

impl From<BlobId> for Location {
    fn from(id: BlobId) -> Self {
        Self {
            bucket: id.bucket,
            prefix: Some(id.name),
        }
    }
}

/// A listing target that is either a URI or a `(bucket, path)` pair.
#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum ListingAddress {
    /// An unparsed `gs://bucket[/prefix]` address.
    Uri(String),
    /// A location that needs no parsing.
    Resolved(Location),
}

impl ListingAddress {
    /// Normalizes this address into a [`Location`].
    pub fn resolve(self) -> Result<Location> {
        match self {
            Self::Uri(uri) => Location::parse(&uri),
            Self::Resolved(location) if location.bucket.is_empty() => Err(Error::InvalidUri {
                uri: location.to_string(),
                reason: "missing bucket name",
            }),
            Self::Resolved(location) if location.bucket.contains('/') => Err(Error::InvalidUri {
                uri: location.to_string(),
                reason: "bucket name must not contain '/'",
            }),
            Self::Resolved(location) => Ok(location),
        }
    }
}

impl From<&str> for ListingAddress {
    fn from(uri: &str) -> Self {
        Self::Uri(uri.to_owned())
    }
}

impl<B, P> From<(B, P)> for ListingAddress
where
    B: Into<String>,
    P: Into<String>,
{
    fn from((bucket, path): (B, P)) -> Self {
        Self::Resolved(Location::new(bucket, path))
    }
}
