//! Google Cloud Storage backend over the JSON API.

#[cfg(test)]
mod stub;
mod upload;
mod wire;

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{CONTENT_TYPE, LOCATION};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use url::Url;

use self::upload::ResumableSink;
use self::wire::{
    BucketResource, ErrorResponse, ObjectList, ObjectResource, ObjectUpload, RewriteResponse,
};
use super::{Backend, ByteStream, ObjectSink};
use crate::types::{BlobDescriptor, BucketDescriptor, ListingPage};
use crate::uri::BlobId;
use crate::{Error, ListOptions, Result, StorageConfig, TRACING_TARGET_BACKEND};

const API_PATH: &str = "storage/v1";
const UPLOAD_PATH: &str = "upload/storage/v1";
const MULTIPART_BOUNDARY: &str = "cirrus_storage_multipart_boundary";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Backend speaking the Cloud Storage JSON API.
///
/// Requests carry the configured bearer token as-is. A custom endpoint
/// points the backend at an emulator such as `fake-gcs-server`.
#[derive(Clone)]
pub struct GcsBackend {
    http: Client,
    endpoint: Url,
    project: Option<String>,
    access_token: Option<String>,
}

impl GcsBackend {
    /// Creates a backend from a validated configuration.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(concat!("cirrus-storage/", env!("CARGO_PKG_VERSION")))
            // Resumable uploads answer intermediate chunks with a bare 308.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        let endpoint = config.endpoint()?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::config(format!("Invalid endpoint '{endpoint}'")));
        }

        tracing::debug!(
            target: TRACING_TARGET_BACKEND,
            endpoint = %endpoint,
            project = ?config.project(),
            "Created GCS backend"
        );

        Ok(Self {
            http,
            endpoint,
            project: config.project().map(str::to_owned),
            access_token: config.access_token().map(str::to_owned),
        })
    }

    /// Builds `{endpoint}/{base}/{segments...}` with each segment
    /// percent-encoded, slashes included.
    fn url(&self, base: &str, segments: &[&str]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            path.extend(base.split('/'));
            path.extend(segments);
        }
        url
    }

    fn bucket_url(&self, bucket: &str) -> Url {
        self.url(API_PATH, &["b", bucket])
    }

    fn object_url(&self, id: &BlobId) -> Url {
        self.url(API_PATH, &["b", id.bucket(), "o", id.name()])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        authorize(self.http.request(method, url), self.access_token.as_deref())
    }

    async fn fetch_object(&self, id: &BlobId) -> Result<Option<BlobDescriptor>> {
        let response = self.request(Method::GET, self.object_url(id)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resource: ObjectResource = check(response).await?.json().await?;
        resource.into_descriptor().map(Some)
    }
}

impl fmt::Debug for GcsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsBackend")
            .field("endpoint", &self.endpoint.as_str())
            .field("project", &self.project)
            .field("access_token", &self.access_token.as_ref().map(|_| "****"))
            .finish()
    }
}

#[async_trait::async_trait]
impl Backend for GcsBackend {
    fn name(&self) -> &'static str {
        "gcs"
    }

    async fn get_bucket(&self, name: &str) -> Result<Option<BucketDescriptor>> {
        let response = self
            .request(Method::GET, self.bucket_url(name))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let resource: BucketResource = check(response).await?.json().await?;
        Ok(Some(resource.into()))
    }

    async fn create_bucket(&self, bucket: &BucketDescriptor) -> Result<BucketDescriptor> {
        let mut url = self.url(API_PATH, &["b"]);
        if let Some(project) = &self.project {
            url.query_pairs_mut().append_pair("project", project);
        }

        let response = self
            .request(Method::POST, url)
            .json(&BucketResource::from(bucket))
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            return Err(Error::BucketExists(bucket.name.clone()));
        }

        let resource: BucketResource = check(response).await?.json().await?;
        Ok(resource.into())
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool> {
        let response = self
            .request(Method::DELETE, self.bucket_url(name))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            StatusCode::CONFLICT => Err(Error::BucketNotEmpty(name.to_owned())),
            _ => check(response).await.map(|_| true),
        }
    }

    async fn get_object(&self, id: &BlobId) -> Result<Option<BlobDescriptor>> {
        self.fetch_object(id).await
    }

    async fn create_object(
        &self,
        descriptor: &BlobDescriptor,
        content: Bytes,
    ) -> Result<BlobDescriptor> {
        let mut url = self.url(UPLOAD_PATH, &["b", descriptor.bucket(), "o"]);
        url.query_pairs_mut().append_pair("uploadType", "multipart");

        let body = multipart_body(descriptor, &content)?;
        let response = self
            .request(Method::POST, url)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(body)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::BucketNotFound(descriptor.bucket().to_owned()));
        }

        let resource: ObjectResource = check(response).await?.json().await?;
        resource.into_descriptor()
    }

    async fn delete_object(&self, id: &BlobId) -> Result<bool> {
        let response = self
            .request(Method::DELETE, self.object_url(id))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => check(response).await.map(|_| true),
        }
    }

    async fn copy_object(&self, source: &BlobId, target: &BlobId) -> Result<BlobDescriptor> {
        let base = self.url(
            API_PATH,
            &[
                "b",
                source.bucket(),
                "o",
                source.name(),
                "rewriteTo",
                "b",
                target.bucket(),
                "o",
                target.name(),
            ],
        );

        // Large or cross-location copies complete over several calls.
        let mut token: Option<String> = None;
        loop {
            let mut url = base.clone();
            if let Some(token) = &token {
                url.query_pairs_mut().append_pair("rewriteToken", token);
            }

            let response = self.request(Method::POST, url).send().await?;
            if response.status() == StatusCode::NOT_FOUND {
                // The API answers 404 for a missing source and a missing
                // destination bucket alike.
                if self.get_bucket(target.bucket()).await?.is_none() {
                    return Err(Error::BucketNotFound(target.bucket().to_owned()));
                }
                return Err(Error::ObjectNotFound(source.clone()));
            }

            let rewrite: RewriteResponse = check(response).await?.json().await?;
            if rewrite.done {
                return match rewrite.resource {
                    Some(resource) => resource.into_descriptor(),
                    None => self
                        .fetch_object(target)
                        .await?
                        .ok_or_else(|| Error::ObjectNotFound(target.clone())),
                };
            }

            tracing::debug!(
                target: TRACING_TARGET_BACKEND,
                source = %source,
                target = %target,
                rewritten = ?rewrite.total_bytes_rewritten,
                "Copy in progress"
            );

            token = match rewrite.rewrite_token {
                Some(token) => Some(token),
                None => {
                    return Err(Error::backend(
                        "rewrite response is neither done nor resumable",
                    ));
                }
            };
        }
    }

    async fn list_objects(&self, bucket: &str, options: &ListOptions) -> Result<ListingPage> {
        let mut url = self.url(API_PATH, &["b", bucket, "o"]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("maxResults", &options.effective_page_size().to_string());
            if let Some(prefix) = &options.prefix {
                query.append_pair("prefix", prefix);
            }
            if let Some(token) = &options.page_token {
                query.append_pair("pageToken", token);
            }
            if options.current_directory {
                query.append_pair("delimiter", "/");
            }
            if options.versions {
                query.append_pair("versions", "true");
            }
        }

        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::BucketNotFound(bucket.to_owned()));
        }

        let list: ObjectList = check(response).await?.json().await?;
        let mut blobs = list
            .items
            .into_iter()
            .map(ObjectResource::into_descriptor)
            .collect::<Result<Vec<_>>>()?;
        for prefix in &list.prefixes {
            blobs.push(BlobDescriptor::directory(BlobId::new(bucket, prefix.as_str())?));
        }
        blobs.sort_by(|a, b| a.id.name().cmp(b.id.name()));

        Ok(ListingPage::new(blobs, list.next_page_token).with_prefixes(list.prefixes))
    }

    async fn open_read(&self, id: &BlobId) -> Result<ByteStream> {
        let mut url = self.object_url(id);
        url.query_pairs_mut().append_pair("alt", "media");

        let response = self.request(Method::GET, url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ObjectNotFound(id.clone()));
        }

        let response = check(response).await?;
        Ok(response.bytes_stream().map_err(Error::from).boxed())
    }

    async fn open_write(&self, descriptor: &BlobDescriptor) -> Result<Box<dyn ObjectSink>> {
        let mut url = self.url(UPLOAD_PATH, &["b", descriptor.bucket(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("name", descriptor.name());

        let response = self
            .request(Method::POST, url)
            .json(&ObjectUpload::from(descriptor))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::BucketNotFound(descriptor.bucket().to_owned()));
        }

        let response = check(response).await?;
        let session = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| Error::backend("resumable upload response has no session URI"))?;
        let session = Url::parse(session)
            .map_err(|e| Error::backend(format!("invalid resumable session URI: {e}")))?;

        tracing::debug!(
            target: TRACING_TARGET_BACKEND,
            blob = %descriptor.id,
            "Opened resumable upload session"
        );

        Ok(Box::new(ResumableSink::new(
            self.http.clone(),
            self.access_token.clone(),
            session,
            descriptor.id.clone(),
        )))
    }
}

fn authorize(builder: RequestBuilder, access_token: Option<&str>) -> RequestBuilder {
    match access_token {
        Some(token) => builder.bearer_auth(token),
        None => builder,
    }
}

/// Passes successful responses through and turns the rest into
/// [`Error::Backend`] carrying the API's error message.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.is_empty() => status.to_string(),
        Err(_) => body,
    };

    Err(Error::Backend {
        status: Some(status.as_u16()),
        message,
    })
}

/// Builds a `multipart/related` body: JSON metadata, then the content.
fn multipart_body(descriptor: &BlobDescriptor, content: &[u8]) -> Result<Bytes> {
    let metadata = serde_json::to_vec(&ObjectUpload::from(descriptor))?;
    let content_type = descriptor
        .metadata
        .content_type
        .as_deref()
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    let mut body = BytesMut::with_capacity(metadata.len() + content.len() + 256);
    body.put_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.put_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.put_slice(&metadata);
    body.put_slice(format!("\r\n--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.put_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.put_slice(content);
    body.put_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    Ok(body.freeze())
}
