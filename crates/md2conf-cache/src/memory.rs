//! In-memory metadata cache.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use crate::{CacheError, CacheRecord, MetadataCache};

/// [`MetadataCache`] kept in process memory.
///
/// Nothing survives the process. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryMetadataCache {
    records: Mutex<HashMap<String, CacheRecord>>,
}

impl MetadataCache for MemoryMetadataCache {
    fn keys(&self) -> Vec<String> {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.keys().cloned().collect()
    }

    fn load(&self, key: &str) -> CacheRecord {
        let records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.get(key).cloned().unwrap_or_default()
    }

    fn save(&self, key: &str, record: &CacheRecord) -> Result<(), CacheError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.insert(key.to_owned(), record.clone());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.remove(key);
        Ok(())
    }
}
