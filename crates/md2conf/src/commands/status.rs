//! `md2conf status` command implementation.

use std::fmt;
use std::path::PathBuf;

use clap::Args;
use md2conf_cache::{CacheRecord, MetadataCache, content_hash};
use md2conf_config::{CliSettings, Config};

use super::{document_key, open_cache, read_markdown, render_document};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the status command.
#[derive(Args)]
pub(crate) struct StatusArgs {
    /// Markdown files to check.
    #[arg(required = true)]
    markdown_files: Vec<PathBuf>,

    /// Path to configuration file (default: auto-discover md2conf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Metadata cache file (overrides config).
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,
}

/// Publishing state of a document relative to its cache record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DocumentStatus {
    /// Never published.
    New,
    /// Rendered body differs from the published one.
    Changed,
    /// Rendered body matches the published one.
    Unchanged,
}

impl DocumentStatus {
    pub(crate) fn classify(record: &CacheRecord, hash: &str) -> Self {
        if record.is_new() {
            Self::New
        } else if record.is_current(hash) {
            Self::Unchanged
        } else {
            Self::Changed
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::New => "new",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        })
    }
}

impl StatusArgs {
    /// Execute the status command.
    ///
    /// # Errors
    ///
    /// Returns an error if a file or the cache cannot be read.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let cli_settings = CliSettings {
            cache_path: self.cache.clone(),
            ..Default::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let cache = open_cache(&config)?;

        for path in &self.markdown_files {
            let markdown = read_markdown(path)?;
            let rendered = render_document(&config, path, &markdown, false);
            let key = document_key(&config, path);
            let status = DocumentStatus::classify(&cache.load(&key), &content_hash(&rendered.body));
            tracing::debug!(key = %key, %status, "Checked document");

            let line = format!("{status:>9}  {key}");
            match status {
                DocumentStatus::New => output.success(&line),
                DocumentStatus::Changed => output.warning(&line),
                DocumentStatus::Unchanged => output.info(&line),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::record_document;
    use md2conf_cache::MemoryMetadataCache;
    use std::path::Path;

    #[test]
    fn test_classify() {
        let hash = content_hash("<p>Hi</p>");

        assert_eq!(DocumentStatus::classify(&CacheRecord::empty(), &hash), DocumentStatus::New);

        let current = CacheRecord::new(Some("1".to_owned()), "Hi", hash.clone());
        assert_eq!(DocumentStatus::classify(&current, &hash), DocumentStatus::Unchanged);

        let stale = CacheRecord::new(Some("1".to_owned()), "Hi", content_hash("<p>Old</p>"));
        assert_eq!(DocumentStatus::classify(&stale, &hash), DocumentStatus::Changed);

        // A record without a stored hash never counts as current
        let unhashed = CacheRecord::new(Some("1".to_owned()), "Hi", "");
        assert_eq!(DocumentStatus::classify(&unhashed, &hash), DocumentStatus::Changed);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{:>9}", DocumentStatus::New), "      new");
        assert_eq!(DocumentStatus::Unchanged.to_string(), "unchanged");
    }

    #[test]
    fn test_recorded_document_is_unchanged() {
        let config = Config::default();
        let cache = MemoryMetadataCache::default();
        let path = Path::new("docs/a.md");
        let status = |markdown: &str| {
            let rendered = render_document(&config, path, markdown, false);
            DocumentStatus::classify(&cache.load("docs/a.md"), &content_hash(&rendered.body))
        };

        assert_eq!(status("# A\n\nOne\n"), DocumentStatus::New);

        let rendered = render_document(&config, path, "# A\n\nOne\n", false);
        record_document(&cache, "docs/a.md", "7", &rendered).unwrap();

        assert_eq!(status("# A\n\nOne\n"), DocumentStatus::Unchanged);
        assert_eq!(status("# A\n\nTwo\n"), DocumentStatus::Changed);
    }
}
