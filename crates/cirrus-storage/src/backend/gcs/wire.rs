//! JSON resources of the Cloud Storage JSON API.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::types::{BlobDescriptor, BlobMetadata, BucketDescriptor, StorageClass};
use crate::uri::BlobId;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct BucketResource {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<StorageClass>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versioning: Option<Versioning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<Website>,
    #[serde(default, skip_serializing)]
    pub time_created: Option<Timestamp>,
    #[serde(default, skip_serializing)]
    pub updated: Option<Timestamp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(super) struct Versioning {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Website {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_page_suffix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_found_page: Option<String>,
}

impl From<&BucketDescriptor> for BucketResource {
    fn from(bucket: &BucketDescriptor) -> Self {
        let website = (bucket.index_page.is_some() || bucket.not_found_page.is_some()).then(|| {
            Website {
                main_page_suffix: bucket.index_page.clone(),
                not_found_page: bucket.not_found_page.clone(),
            }
        });

        Self {
            name: bucket.name.clone(),
            location: bucket.location.clone(),
            storage_class: bucket.storage_class,
            versioning: bucket
                .versioning_enabled
                .map(|enabled| Versioning { enabled }),
            website,
            time_created: None,
            updated: None,
        }
    }
}

impl From<BucketResource> for BucketDescriptor {
    fn from(resource: BucketResource) -> Self {
        let website = resource.website.unwrap_or_default();

        Self {
            name: resource.name,
            location: resource.location,
            storage_class: resource.storage_class,
            versioning_enabled: resource.versioning.map(|v| v.enabled),
            index_page: website.main_page_suffix,
            not_found_page: website.not_found_page,
            created: resource.time_created,
            updated: resource.updated,
        }
    }
}

/// Object resource. Sizes and generations are int64 values the API encodes
/// as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ObjectResource {
    pub bucket: String,
    pub name: String,
    #[serde(default)]
    pub cache_control: Option<String>,
    #[serde(default)]
    pub content_disposition: Option<String>,
    #[serde(default)]
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub content_language: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub generation: Option<String>,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub time_created: Option<Timestamp>,
    #[serde(default)]
    pub updated: Option<Timestamp>,
    #[serde(default)]
    pub time_deleted: Option<Timestamp>,
}

impl ObjectResource {
    pub fn into_descriptor(self) -> Result<BlobDescriptor> {
        let id = BlobId::new(self.bucket, self.name)?;

        Ok(BlobDescriptor {
            metadata: BlobMetadata {
                cache_control: self.cache_control,
                content_disposition: self.content_disposition,
                content_encoding: self.content_encoding,
                content_language: self.content_language,
                content_type: self.content_type,
            },
            size: self.size.and_then(|size| size.parse().ok()),
            generation: self.generation.and_then(|generation| generation.parse().ok()),
            etag: self.etag,
            created: self.time_created,
            updated: self.updated,
            deleted: self.time_deleted,
            ..BlobDescriptor::new(id)
        })
    }
}

/// Object metadata sent with uploads.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ObjectUpload<'a> {
    pub name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_disposition: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<&'a str>,
}

impl<'a> From<&'a BlobDescriptor> for ObjectUpload<'a> {
    fn from(descriptor: &'a BlobDescriptor) -> Self {
        let metadata = &descriptor.metadata;
        Self {
            name: descriptor.name(),
            cache_control: metadata.cache_control.as_deref(),
            content_disposition: metadata.content_disposition.as_deref(),
            content_encoding: metadata.content_encoding.as_deref(),
            content_language: metadata.content_language.as_deref(),
            content_type: metadata.content_type.as_deref(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ObjectList {
    #[serde(default)]
    pub items: Vec<ObjectResource>,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RewriteResponse {
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub rewrite_token: Option<String>,
    #[serde(default)]
    pub total_bytes_rewritten: Option<String>,
    #[serde(default)]
    pub resource: Option<ObjectResource>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorBody {
    pub message: String,
}
