use serde::{Deserialize, Serialize};

/// One line of the durable log.
///
/// Field order is part of the on-disk format: `short_url` first, then
/// `original_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub short_url: String,
    pub original_url: String,
}

impl UrlRecord {
    pub fn new(short_url: impl Into<String>, original_url: impl Into<String>) -> Self {
        Self {
            short_url: short_url.into(),
            original_url: original_url.into(),
        }
    }
}

/// Body of `POST /api/shorten`.
#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
}

/// Response of `POST /api/shorten`.
#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub result: String,
}
