use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::{OptionMap, translate};
use crate::Result;

/// Page size used when a listing does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// Options recognized when listing a bucket.
///
/// Keys: `current-directory`, `page-size`, `page-token`, `prefix`,
/// `versions`. A `page-size` of zero or below is rejected.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ListOptions {
    /// List only the entries directly under the prefix, folding deeper names
    /// into directory entries.
    pub current_directory: bool,
    /// Maximum number of entries per page.
    pub page_size: Option<NonZeroU32>,
    /// Cursor returned by a previous page.
    pub page_token: Option<String>,
    /// Only names starting with this string are listed.
    pub prefix: Option<String>,
    /// Include non-current object versions.
    pub versions: bool,
}

impl ListOptions {
    /// Creates options that list the whole bucket.
    pub fn new() -> Self {
        Self::default()
    }

    /// Translates an option map.
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        translate("list", options)
    }

    /// Restricts the listing to one directory level.
    pub fn with_current_directory(mut self, current_directory: bool) -> Self {
        self.current_directory = current_directory;
        self
    }

    /// Sets the page size.
    pub fn with_page_size(mut self, page_size: NonZeroU32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Continues from a previous page.
    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = Some(page_token.into());
        self
    }

    /// Sets the name prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Includes non-current versions.
    pub fn with_versions(mut self, versions: bool) -> Self {
        self.versions = versions;
        self
    }

    /// Returns the page size, falling back to [`DEFAULT_PAGE_SIZE`].
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.map_or(DEFAULT_PAGE_SIZE, NonZeroU32::get)
    }
}
