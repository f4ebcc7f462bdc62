//! Single pages of a bucket listing.

use serde::{Deserialize, Serialize};

use super::BlobDescriptor;

/// One page of a listing plus the cursor for the next.
///
/// The token is opaque and only meaningful to the backend that issued it.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ListingPage {
    /// Objects on this page, directory entries included.
    pub blobs: Vec<BlobDescriptor>,
    /// Common prefixes, populated by delimiter listings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
    /// Cursor for the following page, absent on the last one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl ListingPage {
    /// Creates a page.
    pub fn new(blobs: Vec<BlobDescriptor>, next_page_token: Option<String>) -> Self {
        Self {
            blobs,
            prefixes: Vec::new(),
            next_page_token,
        }
    }

    /// Sets the common prefixes.
    pub fn with_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.prefixes = prefixes;
        self
    }

    /// Returns whether another page follows.
    #[inline]
    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }

    /// Returns the number of entries on this page.
    #[inline]
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns whether the page holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}
