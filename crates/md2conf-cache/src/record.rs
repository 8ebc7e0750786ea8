//! Cached page metadata.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Metadata recorded for a published document.
///
/// Serialized with the field names `id`, `title` and `sha256`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Confluence page ID, once the page exists.
    #[serde(rename = "id")]
    pub page_id: Option<String>,
    /// Page title.
    #[serde(default)]
    pub title: String,
    /// Hex-encoded SHA-256 of the published page body.
    #[serde(rename = "sha256", default)]
    pub content_hash: String,
}

impl CacheRecord {
    /// Create a record.
    #[must_use]
    pub fn new(page_id: Option<String>, title: impl Into<String>, content_hash: impl Into<String>) -> Self {
        Self {
            page_id,
            title: title.into(),
            content_hash: content_hash.into(),
        }
    }

    /// The record returned for unknown keys: no page, empty title and hash.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this is the empty record (document never published).
    #[must_use]
    pub fn is_new(&self) -> bool {
        *self == Self::empty()
    }

    /// Whether the published body has the given hash.
    #[must_use]
    pub fn is_current(&self, content_hash: &str) -> bool {
        !self.content_hash.is_empty() && self.content_hash == content_hash
    }
}

/// Hex-encoded SHA-256 of a page body.
#[must_use]
pub fn content_hash(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}
