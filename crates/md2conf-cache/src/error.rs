//! Cache error types.

/// Error while reading or persisting the metadata cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// The cache file is not valid JSON.
    #[error("JSON error")]
    Json(#[from] serde_json::Error),

    /// Replacing the cache file with the freshly written copy failed.
    #[error("failed to persist cache file")]
    Persist(#[from] tempfile::PersistError),
}
