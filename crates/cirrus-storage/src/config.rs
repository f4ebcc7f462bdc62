//! Storage service configuration.

use std::fmt;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use url::Url;

use crate::{Error, Result};

/// Public endpoint of the Google Cloud Storage JSON API.
pub const DEFAULT_GCS_ENDPOINT: &str = "https://storage.googleapis.com";

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

/// Storage backend selected by configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Google Cloud Storage over its JSON API.
    #[default]
    Gcs,
    /// Process-local store, nothing is persisted.
    Memory,
}

/// Configuration for building a [`Storage`](crate::Storage) handle.
///
/// Authentication is limited to a pre-acquired OAuth2 access token; obtaining
/// and refreshing it is left to the caller.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct StorageConfig {
    /// Storage backend (gcs, memory)
    #[serde(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-provider", env = "CIRRUS_STORAGE_PROVIDER", default_value_t = Provider::Gcs)
    )]
    pub storage_provider: Provider,

    /// Project that owns newly created buckets
    #[serde(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-project", env = "CIRRUS_STORAGE_PROJECT")
    )]
    pub storage_project: Option<String>,

    /// OAuth2 bearer token sent with every request
    #[serde(default, skip_serializing)]
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-access-token", env = "CIRRUS_STORAGE_ACCESS_TOKEN", hide_env_values = true)
    )]
    pub storage_access_token: Option<String>,

    /// API endpoint override, e.g. a local emulator
    #[serde(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-endpoint", env = "CIRRUS_STORAGE_ENDPOINT")
    )]
    pub storage_endpoint: Option<Url>,

    /// Connection timeout in seconds
    #[serde(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-connect-timeout", env = "CIRRUS_STORAGE_CONNECT_TIMEOUT_SECS")
    )]
    pub storage_connect_timeout: Option<u64>,

    /// Request timeout in seconds
    #[serde(default)]
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-request-timeout", env = "CIRRUS_STORAGE_REQUEST_TIMEOUT_SECS")
    )]
    pub storage_request_timeout: Option<u64>,
}

impl StorageConfig {
    /// Creates a configuration for the given provider.
    pub fn new(provider: Provider) -> Self {
        Self {
            storage_provider: provider,
            storage_project: None,
            storage_access_token: None,
            storage_endpoint: None,
            storage_connect_timeout: None,
            storage_request_timeout: None,
        }
    }

    /// Creates a Google Cloud Storage configuration.
    pub fn gcs(project: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self::new(Provider::Gcs)
            .with_project(project)
            .with_access_token(access_token)
    }

    /// Creates an in-memory configuration.
    pub fn memory() -> Self {
        Self::new(Provider::Memory)
    }

    /// Sets the project.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.storage_project = Some(project.into());
        self
    }

    /// Sets the access token.
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.storage_access_token = Some(token.into());
        self
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.storage_endpoint = Some(endpoint);
        self
    }

    /// Sets the connection timeout in seconds.
    #[must_use]
    pub fn with_connect_timeout_secs(mut self, secs: u64) -> Self {
        self.storage_connect_timeout = Some(secs);
        self
    }

    /// Sets the request timeout in seconds.
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.storage_request_timeout = Some(secs);
        self
    }

    /// Returns the selected provider.
    #[inline]
    pub fn provider(&self) -> Provider {
        self.storage_provider
    }

    /// Returns the project, if set.
    #[inline]
    pub fn project(&self) -> Option<&str> {
        self.storage_project.as_deref()
    }

    /// Returns the access token, if set.
    #[inline]
    pub fn access_token(&self) -> Option<&str> {
        self.storage_access_token.as_deref()
    }

    /// Returns the endpoint, falling back to the public GCS endpoint.
    pub fn endpoint(&self) -> Result<Url> {
        match &self.storage_endpoint {
            Some(endpoint) => Ok(endpoint.clone()),
            None => Url::parse(DEFAULT_GCS_ENDPOINT)
                .map_err(|e| Error::config(format!("Invalid default endpoint: {e}"))),
        }
    }

    /// Returns whether a custom endpoint is configured.
    #[inline]
    pub fn has_custom_endpoint(&self) -> bool {
        self.storage_endpoint.is_some()
    }

    /// Returns the connection timeout.
    #[inline]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(
            self.storage_connect_timeout
                .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        )
    }

    /// Returns the request timeout.
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.storage_request_timeout
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Returns a masked version of the access token for logging.
    pub fn access_token_masked(&self) -> Option<String> {
        self.storage_access_token.as_deref().map(mask)
    }

    /// Validates the configuration.
    ///
    /// A GCS configuration needs an access token unless it targets a custom
    /// endpoint, which is how local emulators are reached.
    pub fn validate(&self) -> Result<()> {
        if let Some(endpoint) = &self.storage_endpoint {
            if !matches!(endpoint.scheme(), "http" | "https") {
                return Err(Error::config(format!(
                    "Invalid endpoint scheme '{}', expected 'http' or 'https'",
                    endpoint.scheme()
                )));
            }

            if endpoint.host().is_none() {
                return Err(Error::config("Endpoint must include a valid hostname"));
            }
        }

        if self.storage_connect_timeout == Some(0) {
            return Err(Error::config("Connect timeout must be greater than zero"));
        }

        if self.storage_request_timeout == Some(0) {
            return Err(Error::config("Request timeout must be greater than zero"));
        }

        if self.storage_provider == Provider::Gcs {
            let has_token = self
                .storage_access_token
                .as_deref()
                .is_some_and(|token| !token.trim().is_empty());

            if !has_token && !self.has_custom_endpoint() {
                return Err(Error::config(
                    "Access token is required for the public GCS endpoint",
                ));
            }

            if self
                .storage_project
                .as_deref()
                .is_some_and(|project| project.trim().is_empty())
            {
                return Err(Error::config("Project cannot be blank"));
            }
        }

        Ok(())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(Provider::default())
    }
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("provider", &self.storage_provider)
            .field("project", &self.storage_project)
            .field("access_token", &self.access_token_masked())
            .field("endpoint", &self.storage_endpoint.as_ref().map(Url::as_str))
            .field("connect_timeout", &self.connect_timeout())
            .field("request_timeout", &self.request_timeout())
            .finish()
    }
}

fn mask(secret: &str) -> String {
    if secret.len() <= 8 {
        return "*".repeat(secret.len());
    }

    let visible: String = secret.chars().take(4).collect();
    format!("{visible}{}", "*".repeat(8))
}
