//! `md2conf convert` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use md2conf_cache::MetadataCache;
use md2conf_config::{CliSettings, Config};
use md2conf_renderer::{ReferenceResolver, resolve_references};

use super::{document_key, open_cache, read_markdown, record_document, render_document};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the convert command.
#[derive(Args)]
pub(crate) struct ConvertArgs {
    /// Path to the markdown file.
    markdown_file: PathBuf,

    /// Path to configuration file (default: auto-discover md2conf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render the first H1 heading instead of using it as the page title.
    #[arg(long)]
    no_extract_title: bool,

    /// Append the child page listing macro.
    #[arg(long)]
    autoindex: bool,

    /// Replace cross-document references with links to cached page titles.
    #[arg(long)]
    resolve_refs: bool,

    /// Save the rendered page in the metadata cache as published under this page ID.
    #[arg(long, value_name = "PAGE_ID")]
    record: Option<String>,

    /// Metadata cache file (overrides config).
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,

    /// Confluence base URL (overrides config).
    #[arg(long, env = "MD2CONF_BASE_URL")]
    base_url: Option<String>,
}

impl ConvertArgs {
    /// Execute the convert command.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or cache cannot be read, or the cache
    /// cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            base_url: self.base_url.clone(),
            cache_path: self.cache.clone(),
            extract_title: self.no_extract_title.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let markdown = read_markdown(&self.markdown_file)?;
        tracing::info!(path = %self.markdown_file.display(), "Converting");
        let result = render_document(&config, &self.markdown_file, &markdown, self.autoindex);

        let cache = if self.resolve_refs || self.record.is_some() {
            Some(open_cache(&config)?)
        } else {
            None
        };

        if let (Some(cache), Some(page_id)) = (&cache, &self.record) {
            let key = document_key(&config, &self.markdown_file);
            let record = record_document(cache, &key, page_id, &result)?;
            output.success(&format!("Recorded {key} as page {page_id} ({})", record.title));
        }

        let body = if let (Some(cache), true) = (&cache, self.resolve_refs) {
            let resolver = CachedTitles::new(&config, cache, &self.markdown_file);
            let resolution = resolve_references(&result.body, &resolver);
            for target in &resolution.unresolved {
                output.warning(&format!("Unresolved reference: {target}"));
            }
            resolution.body
        } else {
            result.body
        };

        if let Some(title) = &result.title {
            output.highlight(&format!("Title: {title}"));
        }
        output.data(&body)?;
        Ok(())
    }
}

/// Resolves reference targets to page titles stored in the metadata cache.
///
/// A target is looked up relative to the referring document first, then as a
/// key on its own.
struct CachedTitles<'a> {
    config: &'a Config,
    cache: &'a dyn MetadataCache,
    document_dir: PathBuf,
}

impl<'a> CachedTitles<'a> {
    fn new(config: &'a Config, cache: &'a dyn MetadataCache, document: &Path) -> Self {
        Self {
            config,
            cache,
            document_dir: document.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }

    fn title_for(&self, key: &str) -> Option<String> {
        let record = self.cache.load(key);
        (!record.title.is_empty()).then_some(record.title)
    }
}

impl ReferenceResolver for CachedTitles<'_> {
    fn resolve(&self, path: &str) -> Option<String> {
        let sibling = document_key(self.config, &self.document_dir.join(path));
        self.title_for(&sibling)
            .or_else(|| self.title_for(path.trim_start_matches('/')))
    }
}
