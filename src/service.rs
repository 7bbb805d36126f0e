use std::sync::Arc;

use url::Url;

use crate::error::{ShortenError, StorageError};
use crate::hasher;
use crate::models::UrlRecord;
use crate::storage::UrlStorage;

/// Creates and resolves short links on top of a [`UrlStorage`] backend.
///
/// Keys are derived from the URL itself, so shortening the same URL twice
/// returns the same link. No uniqueness check is made: a hash collision
/// silently replaces the earlier mapping.
#[derive(Clone)]
pub struct ShortenerService {
    storage: Arc<dyn UrlStorage>,
    base_url: String,
}

impl ShortenerService {
    pub fn new(storage: Arc<dyn UrlStorage>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { storage, base_url }
    }

    /// Shorten `raw_url` and return the public link `{base_url}/{key}`.
    ///
    /// Surrounding whitespace is dropped; the rest is hashed and stored
    /// exactly as submitted. A storage failure is returned after the
    /// in-memory mapping has already been updated.
    pub async fn shorten(&self, raw_url: &str) -> Result<String, ShortenError> {
        let original_url = raw_url.trim();
        validate_url(original_url)?;

        let key = hasher::short_key(original_url);
        self.storage
            .save(UrlRecord::new(key.as_str(), original_url))
            .await?;

        tracing::debug!("shortened {} -> {}", original_url, key);
        Ok(self.link_for(&key))
    }

    /// Look up the original URL behind `key`.
    pub fn resolve(&self, key: &str) -> Result<String, ShortenError> {
        self.storage
            .get(key)
            .ok_or_else(|| ShortenError::NotFound(key.to_owned()))
    }

    pub fn link_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn storage_description(&self) -> String {
        self.storage.describe()
    }

    pub async fn close(&self) -> Result<(), StorageError> {
        self.storage.close().await
    }
}

/// Accept only absolute URLs: a scheme is required, and hierarchical
/// schemes need a host.
fn validate_url(url: &str) -> Result<(), ShortenError> {
    let invalid = |reason: String| ShortenError::InvalidUrl {
        url: url.to_owned(),
        reason,
    };

    if url.is_empty() {
        return Err(invalid("url is empty".into()));
    }

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !parsed.cannot_be_a_base() && parsed.host().is_none() && parsed.scheme() != "file" {
        return Err(invalid("url has no host".into()));
    }
    Ok(())
}
