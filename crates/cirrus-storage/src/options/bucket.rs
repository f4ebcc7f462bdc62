use serde::{Deserialize, Serialize};

use super::{OptionMap, translate};
use crate::Result;
use crate::types::{BucketDescriptor, StorageClass};

/// Options recognized when creating a bucket.
///
/// Keys: `index-page`, `location`, `not-found-page`, `storage-class`,
/// `versioning-enabled`.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BucketOptions {
    pub index_page: Option<String>,
    pub location: Option<String>,
    pub not_found_page: Option<String>,
    pub storage_class: Option<StorageClass>,
    pub versioning_enabled: Option<bool>,
}

impl BucketOptions {
    /// Translates an option map.
    pub fn from_options(options: &OptionMap) -> Result<Self> {
        translate("bucket", options)
    }

    /// Returns `descriptor` with every set option applied.
    pub fn apply(&self, descriptor: BucketDescriptor) -> BucketDescriptor {
        BucketDescriptor {
            index_page: self.index_page.clone().or(descriptor.index_page),
            location: self.location.clone().or(descriptor.location),
            not_found_page: self.not_found_page.clone().or(descriptor.not_found_page),
            storage_class: self.storage_class.or(descriptor.storage_class),
            versioning_enabled: self.versioning_enabled.or(descriptor.versioning_enabled),
            ..descriptor
        }
    }

    /// Builds a descriptor for `name` from these options.
    pub fn into_descriptor(self, name: impl Into<String>) -> BucketDescriptor {
        self.apply(BucketDescriptor::new(name))
    }
}

impl BucketDescriptor {
    /// Builds a descriptor for `name` from an option map.
    pub fn from_options(name: impl Into<String>, options: &OptionMap) -> Result<Self> {
        Ok(BucketOptions::from_options(options)?.into_descriptor(name))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builds_descriptor_from_map() {
        let options = json!({
            "location": "EU",
            "storage-class": "nearline",
            "versioning-enabled": true,
            "index-page": "index.html",
            "not-found-page": "404.html",
        });
        let serde_json::Value::Object(options) = options else {
            unreachable!()
        };

        let bucket = BucketDescriptor::from_options("site", &options).unwrap();
        assert_eq!(bucket.name, "site");
        assert_eq!(bucket.location.as_deref(), Some("EU"));
        assert_eq!(bucket.storage_class, Some(StorageClass::Nearline));
        assert_eq!(bucket.versioning_enabled, Some(true));
        assert_eq!(bucket.index_page.as_deref(), Some("index.html"));
        assert_eq!(bucket.not_found_page.as_deref(), Some("404.html"));
    }

    #[test]
    fn apply_keeps_unset_fields() {
        let base = BucketDescriptor::new("b")
            .with_location("US")
            .with_index_page("home.html");
        let options = BucketOptions {
            location: Some("ASIA".to_owned()),
            ..Default::default()
        };

        let bucket = options.apply(base);
        assert_eq!(bucket.location.as_deref(), Some("ASIA"));
        assert_eq!(bucket.index_page.as_deref(), Some("home.html"));
    }

    #[test]
    fn rejects_unknown_storage_class() {
        let serde_json::Value::Object(options) = json!({ "storage-class": "glacier" }) else {
            unreachable!()
        };
        assert!(BucketOptions::from_options(&options).is_err());
    }
}
