//! File-backed metadata cache.
//!
//! [`FileMetadataCache`] keeps every record in a single JSON document. Each value
//! is itself a JSON-encoded [`CacheRecord`]:
//!
//! ```text
//! {"docs/intro.md": "{\"id\": \"123\", \"title\": \"Intro\", \"sha256\": \"...\"}"}
//! ```
//!
//! The document is loaded once on open. Every `save`/`remove` rewrites it through
//! a temporary file in the same directory that atomically replaces the old copy,
//! so a crash never leaves a truncated cache behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tempfile::NamedTempFile;

use crate::{CacheError, CacheRecord, MetadataCache};

/// [`MetadataCache`] persisted to a JSON file.
///
/// Writers are serialized by an internal lock, so a single instance may be shared
/// between threads. Separate instances on the same file are not coordinated.
#[derive(Debug)]
pub struct FileMetadataCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileMetadataCache {
    /// Open the cache stored at `path`.
    ///
    /// A missing file is an empty cache; it is created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No metadata cache file, starting empty");
                BTreeMap::new()
            }
            Err(err) => return Err(err.into()),
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "Opened metadata cache");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `entries` to disk, replacing the previous file.
    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), CacheError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut file = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut file, entries)?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(&self.path)?;
        Ok(())
    }
}

impl MetadataCache for FileMetadataCache {
    fn keys(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.keys().cloned().collect()
    }

    fn load(&self, key: &str) -> CacheRecord {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(value) = entries.get(key) else {
            return CacheRecord::empty();
        };
        serde_json::from_str(value).unwrap_or_else(|err| {
            tracing::warn!(key, error = %err, "Ignoring undecodable cache record");
            CacheRecord::empty()
        })
    }

    fn save(&self, key: &str, record: &CacheRecord) -> Result<(), CacheError> {
        let value = serde_json::to_string(record)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = entries.insert(key.to_owned(), value);
        if let Err(err) = self.persist(&entries) {
            // Keep memory in sync with what is on disk.
            match previous {
                Some(previous) => entries.insert(key.to_owned(), previous),
                None => entries.remove(key),
            };
            return Err(err);
        }
        tracing::debug!(key, "Saved cache record");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(err) = self.persist(&entries) {
            entries.insert(key.to_owned(), previous);
            return Err(err);
        }
        tracing::debug!(key, "Removed cache record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record() -> CacheRecord {
        CacheRecord::new(Some("123".to_owned()), "A", "abc")
    }

    #[test]
    fn test_missing_file_is_empty_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = FileMetadataCache::open(tmp.path().join("cache.json")).unwrap();
        assert!(cache.keys().is_empty());
        assert_eq!(cache.load("doc/new.md"), CacheRecord::empty());
        // Reading never creates the file
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let cache = FileMetadataCache::open(tmp.path().join("cache.json")).unwrap();

        cache.save("doc/a.md", &record()).unwrap();
        assert_eq!(cache.load("doc/a.md"), record());
    }

    #[test]
    fn test_remove_restores_sentinel() {
        let tmp = TempDir::new().unwrap();
        let cache = FileMetadataCache::open(tmp.path().join("cache.json")).unwrap();

        cache.save("doc/a.md", &record()).unwrap();
        cache.remove("doc/a.md").unwrap();
        assert_eq!(cache.load("doc/a.md"), CacheRecord::empty());
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let tmp = TempDir::new().unwrap();
        let cache = FileMetadataCache::open(tmp.path().join("cache.json")).unwrap();
        cache.remove("never/saved.md").unwrap();
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/cache.json");

        let cache = FileMetadataCache::open(&path).unwrap();
        cache.save("doc/a.md", &record()).unwrap();
        cache.save("doc/b.md", &CacheRecord::new(None, "B", "")).unwrap();
        drop(cache);

        let reopened = FileMetadataCache::open(&path).unwrap();
        let mut keys = reopened.keys();
        keys.sort();
        assert_eq!(keys, vec!["doc/a.md".to_owned(), "doc/b.md".to_owned()]);
        assert_eq!(reopened.load("doc/a.md"), record());
        assert_eq!(reopened.load("doc/b.md").page_id, None);
    }

    #[test]
    fn test_file_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        let cache = FileMetadataCache::open(&path).unwrap();
        cache.save("doc/a.md", &record()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(
            raw,
            r#"{"doc/a.md":"{\"id\":\"123\",\"title\":\"A\",\"sha256\":\"abc\"}"}"#
        );
    }

    #[test]
    fn test_reads_existing_store() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        fs::write(
            &path,
            r#"{"doc/a.md": "{\"id\": \"7\", \"title\": \"Seven\", \"sha256\": \"00\"}"}"#,
        )
        .unwrap();

        let cache = FileMetadataCache::open(&path).unwrap();
        assert_eq!(
            cache.load("doc/a.md"),
            CacheRecord::new(Some("7".to_owned()), "Seven", "00")
        );
    }

    #[test]
    fn test_undecodable_record_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        fs::write(&path, r#"{"doc/a.md": "not json"}"#).unwrap();

        let cache = FileMetadataCache::open(&path).unwrap();
        assert_eq!(cache.keys(), vec!["doc/a.md".to_owned()]);
        assert_eq!(cache.load("doc/a.md"), CacheRecord::empty());
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        fs::write(&path, "{ truncated").unwrap();

        let err = FileMetadataCache::open(&path).unwrap_err();
        assert!(matches!(err, CacheError::Json(_)), "got {err:?}");
    }

    #[test]
    fn test_empty_file_is_empty_cache() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("cache.json");
        fs::write(&path, "").unwrap();

        let cache = FileMetadataCache::open(&path).unwrap();
        assert!(cache.keys().is_empty());
    }

    #[test]
    fn test_shared_between_threads() {
        let tmp = TempDir::new().unwrap();
        let cache = FileMetadataCache::open(tmp.path().join("cache.json")).unwrap();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let cache = &cache;
                scope.spawn(move || {
                    let key = format!("doc/{i}.md");
                    cache
                        .save(&key, &CacheRecord::new(Some(i.to_string()), "T", "h"))
                        .unwrap();
                });
            }
        });

        let reopened = FileMetadataCache::open(cache.path()).unwrap();
        assert_eq!(reopened.keys().len(), 8);
        assert_eq!(reopened.load("doc/5.md").page_id.as_deref(), Some("5"));
    }
}
