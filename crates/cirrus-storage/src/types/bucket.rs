//! Bucket descriptors.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Storage class of a bucket.
///
/// The class only labels the bucket; its pricing and availability semantics
/// belong to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", try_from = "String")]
pub enum StorageClass {
    /// Frequently accessed data.
    Standard,
    /// Data read about once a month.
    Nearline,
    /// Data read about once a quarter.
    Coldline,
    /// Data read less than once a year.
    Archive,
    /// Legacy multi-region class.
    MultiRegional,
    /// Legacy single-region class.
    Regional,
    /// Legacy reduced-redundancy class.
    DurableReducedAvailability,
}

impl TryFrom<String> for StorageClass {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Configuration and backend-owned state of a bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BucketDescriptor {
    /// Bucket name, unique within the storage namespace.
    pub name: String,
    /// Geographic location, e.g. `EU` or `us-central1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Default storage class for new objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<StorageClass>,
    /// Whether object versioning is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning_enabled: Option<bool>,
    /// Object served for directory requests when hosting a website.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_page: Option<String>,
    /// Object served for missing paths when hosting a website.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found_page: Option<String>,
    /// Creation time, set by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Timestamp>,
    /// Last metadata update time, set by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<Timestamp>,
}

impl BucketDescriptor {
    /// Creates a descriptor with backend defaults for everything but the name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            storage_class: None,
            versioning_enabled: None,
            index_page: None,
            not_found_page: None,
            created: None,
            updated: None,
        }
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Sets the storage class.
    pub fn with_storage_class(mut self, storage_class: StorageClass) -> Self {
        self.storage_class = Some(storage_class);
        self
    }

    /// Enables or disables versioning.
    pub fn with_versioning(mut self, enabled: bool) -> Self {
        self.versioning_enabled = Some(enabled);
        self
    }

    /// Sets the website index page.
    pub fn with_index_page(mut self, page: impl Into<String>) -> Self {
        self.index_page = Some(page.into());
        self
    }

    /// Sets the website not-found page.
    pub fn with_not_found_page(mut self, page: impl Into<String>) -> Self {
        self.not_found_page = Some(page.into());
        self
    }

    /// Returns whether versioning is enabled; unset means disabled.
    pub fn is_versioned(&self) -> bool {
        self.versioning_enabled.unwrap_or(false)
    }
}
