//! CLI command implementations.

pub(crate) mod cache;
pub(crate) mod convert;
pub(crate) mod status;

use std::path::{Component, Path, PathBuf};

use md2conf_cache::{CacheRecord, FileMetadataCache, MetadataCache, content_hash};
use md2conf_config::Config;
use md2conf_renderer::{ConfluenceBackend, ConvertOptions, RenderResult};

use crate::error::CliError;

pub(crate) use cache::CacheCommand;
pub(crate) use convert::ConvertArgs;
pub(crate) use status::StatusArgs;

/// Read a markdown file, keeping the path in the error.
fn read_markdown(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Open the metadata cache named by the configuration.
fn open_cache(config: &Config) -> Result<FileMetadataCache, CliError> {
    Ok(FileMetadataCache::open(&config.cache_resolved.path)?)
}

/// Render `markdown` read from `path` with the configured options.
fn render_document(
    config: &Config,
    path: &Path,
    markdown: &str,
    force_autoindex: bool,
) -> RenderResult {
    let backend = ConfluenceBackend::new(config.base_url().map(str::to_owned));
    let options = ConvertOptions {
        extract_title: config.render.extract_title,
        autoindex: force_autoindex || config.render.is_autoindex(path),
    };
    md2conf_renderer::convert(markdown, &backend, options)
}

/// Save `rendered` as the published state of `key` under `page_id`.
///
/// The cached title is kept when the document has no title of its own.
fn record_document(
    cache: &dyn MetadataCache,
    key: &str,
    page_id: &str,
    rendered: &RenderResult,
) -> Result<CacheRecord, CliError> {
    let title = match &rendered.title {
        Some(title) => title.clone(),
        None => cache.load(key).title,
    };
    let record = CacheRecord::new(Some(page_id.to_owned()), title, content_hash(&rendered.body));
    cache.save(key, &record)?;
    tracing::info!(key, page_id, "Recorded published page");
    Ok(record)
}

/// Cache key for a document.
///
/// Paths below the config file's directory are keyed relative to it, anything
/// else by the path as given. Separators are always `/`.
fn document_key(config: &Config, path: &Path) -> String {
    let base = config.config_path.as_deref().and_then(Path::parent);
    let absolute: PathBuf;
    let relative = match base {
        Some(base) if !base.as_os_str().is_empty() => {
            absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            absolute.strip_prefix(base).unwrap_or(path)
        }
        _ => path,
    };

    let mut key = String::new();
    for component in relative.components() {
        match component {
            Component::CurDir => {}
            Component::RootDir => key.push('/'),
            other => {
                if !key.is_empty() && !key.ends_with('/') {
                    key.push('/');
                }
                key.push_str(&other.as_os_str().to_string_lossy());
            }
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use md2conf_cache::MemoryMetadataCache;
    use pretty_assertions::assert_eq;

    fn config_at(path: &str) -> Config {
        let mut config = Config::default();
        config.config_path = Some(PathBuf::from(path));
        config
    }

    #[test]
    fn test_document_key_without_config_file() {
        let config = Config::default();
        assert_eq!(document_key(&config, Path::new("docs/intro.md")), "docs/intro.md");
        assert_eq!(document_key(&config, Path::new("./docs/intro.md")), "docs/intro.md");
    }

    #[test]
    fn test_document_key_relative_to_config_dir() {
        let config = config_at("/project/md2conf.toml");
        assert_eq!(
            document_key(&config, Path::new("/project/docs/intro.md")),
            "docs/intro.md"
        );
    }

    #[test]
    fn test_document_key_outside_config_dir() {
        let config = config_at("/project/md2conf.toml");
        assert_eq!(document_key(&config, Path::new("/elsewhere/a.md")), "/elsewhere/a.md");
    }

    #[test]
    fn test_render_document_autoindex_by_name() {
        let config = Config::default();
        let result = render_document(&config, Path::new("docs/_index.md"), "# Guide\n", false);
        assert_eq!(result.title.as_deref(), Some("Guide"));
        assert!(result.body.contains(r#"<ac:structured-macro ac:name="children" />"#), "{}", result.body);

        let result = render_document(&config, Path::new("docs/page.md"), "Text\n", false);
        assert_eq!(result.body, "<p>Text</p>");
    }

    #[test]
    fn test_record_document() {
        let config = Config::default();
        let cache = MemoryMetadataCache::default();
        let rendered = render_document(&config, Path::new("docs/a.md"), "# Alpha\n\nBody\n", false);

        let record = record_document(&cache, "docs/a.md", "42", &rendered).unwrap();
        assert_eq!(record.page_id.as_deref(), Some("42"));
        assert_eq!(record.title, "Alpha");
        assert_eq!(record.content_hash, content_hash("<p>Body</p>"));
        assert_eq!(cache.load("docs/a.md"), record);
    }

    #[test]
    fn test_record_document_keeps_cached_title() {
        let config = Config::default();
        let cache = MemoryMetadataCache::default();
        cache
            .save("docs/a.md", &CacheRecord::new(Some("42".to_owned()), "Alpha", "old"))
            .unwrap();
        let rendered = render_document(&config, Path::new("docs/a.md"), "No heading\n", false);

        let record = record_document(&cache, "docs/a.md", "42", &rendered).unwrap();
        assert_eq!(record.title, "Alpha");
        assert_eq!(record.content_hash, content_hash("<p>No heading</p>"));
    }
}
