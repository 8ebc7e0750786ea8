//! Page metadata cache for incremental Confluence publishing.
//!
//! Maps a document key (usually the markdown file path) to the Confluence page
//! created for it and the hash of the last published body. A publishing run
//! compares [`content_hash`] of the freshly rendered body with the cached record
//! to skip unchanged pages.
//!
//! - [`MetadataCache`]: cache interface
//! - [`FileMetadataCache`]: JSON file on disk, written through on every change
//! - [`MemoryMetadataCache`]: in-process store for tests and dry runs
//!
//! # Example
//!
//! ```
//! use md2conf_cache::{CacheRecord, MemoryMetadataCache, MetadataCache, content_hash};
//!
//! let cache = MemoryMetadataCache::default();
//! assert!(cache.load("docs/new.md").is_new());
//!
//! let record = CacheRecord::new(Some("123".into()), "Intro", content_hash("<p>Hi</p>"));
//! cache.save("docs/intro.md", &record).unwrap();
//! assert!(cache.load("docs/intro.md").is_current(&content_hash("<p>Hi</p>")));
//! ```

mod error;
mod file;
mod memory;
mod record;

pub use error::CacheError;
pub use file::FileMetadataCache;
pub use memory::MemoryMetadataCache;
pub use record::{CacheRecord, content_hash};

/// Durable mapping from document key to [`CacheRecord`].
///
/// A missing key is not an error: [`load`](Self::load) returns
/// [`CacheRecord::empty`]. Mutating calls complete their write before returning.
pub trait MetadataCache: Send + Sync {
    /// All known keys, in no particular order.
    fn keys(&self) -> Vec<String>;

    /// Record stored for `key`, or the empty record if there is none.
    fn load(&self, key: &str) -> CacheRecord;

    /// Store `record` under `key`, replacing any previous record.
    fn save(&self, key: &str, record: &CacheRecord) -> Result<(), CacheError>;

    /// Delete the record for `key`. Removing a missing key is a no-op.
    fn remove(&self, key: &str) -> Result<(), CacheError>;
}
