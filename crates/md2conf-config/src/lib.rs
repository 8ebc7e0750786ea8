//! Configuration management for md2conf.
//!
//! Parses `md2conf.toml` with serde and discovers it in the current directory
//! or any parent. CLI settings are applied on load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `confluence.base_url`
//! - `cache.path`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
pub const CONFIG_FILENAME: &str = "md2conf.toml";

/// Cache location used when `[cache] path` is not set.
const DEFAULT_CACHE_PATH: &str = ".md2conf/cache.json";

/// CLI settings that override configuration file values.
///
/// Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the Confluence base URL.
    pub base_url: Option<String>,
    /// Override the cache file location.
    pub cache_path: Option<PathBuf>,
    /// Override title extraction.
    pub extract_title: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Confluence configuration.
    pub confluence: Option<ConfluenceConfig>,
    /// Cache configuration (path is a relative string from TOML).
    cache: CacheConfigRaw,
    /// Rendering options.
    pub render: RenderConfig,

    /// Resolved cache configuration (set after loading).
    #[serde(skip)]
    pub cache_resolved: CacheConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Confluence configuration.
#[derive(Debug, Deserialize)]
pub struct ConfluenceConfig {
    /// Confluence server base URL.
    pub base_url: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    path: Option<String>,
}

/// Resolved cache configuration.
#[derive(Debug, Default)]
pub struct CacheConfig {
    /// Metadata cache file.
    pub path: PathBuf,
}

/// Rendering options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Use the first level-one heading as the page title.
    pub extract_title: bool,
    /// File names rendered as index pages (children macro only).
    pub autoindex: Vec<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            extract_title: true,
            autoindex: vec!["_index.md".to_owned(), "index.md".to_owned()],
        }
    }
}

impl RenderConfig {
    /// Whether `path` names an index page.
    #[must_use]
    pub fn is_autoindex(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.autoindex.iter().any(|index| index == name))
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`confluence.base_url`").
        field: String,
        /// Error message (e.g., "${`WIKI_URL`} not set").
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise searches for
    /// `md2conf.toml` in the current directory and parents, falling back to
    /// defaults relative to the current directory.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails or a
    /// value is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Confluence base URL, if configured.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.confluence.as_ref().map(|c| c.base_url.as_str())
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(base_url) = &settings.base_url {
            self.confluence = Some(ConfluenceConfig {
                base_url: base_url.clone(),
            });
        }
        if let Some(cache_path) = &settings.cache_path {
            self.cache_resolved.path.clone_from(cache_path);
        }
        if let Some(extract_title) = settings.extract_title {
            self.render.extract_title = extract_title;
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(confluence) = &self.confluence {
            require_non_empty(&confluence.base_url, "confluence.base_url")?;
            require_http_url(&confluence.base_url, "confluence.base_url")?;
        }
        if self.cache_resolved.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("cache.path cannot be empty".to_owned()));
        }
        Ok(())
    }

    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    fn default_with_base(base: &Path) -> Self {
        Self {
            confluence: None,
            cache: CacheConfigRaw::default(),
            render: RenderConfig::default(),
            cache_resolved: CacheConfig {
                path: base.join(DEFAULT_CACHE_PATH),
            },
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir)?;
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref mut confluence) = self.confluence {
            confluence.base_url = expand::expand_env(&confluence.base_url, "confluence.base_url")?;
        }
        if let Some(ref path) = self.cache.path {
            self.cache.path = Some(expand::expand_env(path, "cache.path")?);
        }
        Ok(())
    }

    /// Resolve the cache path against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) -> Result<(), ConfigError> {
        let path = self.cache.path.as_deref().unwrap_or(DEFAULT_CACHE_PATH);
        require_non_empty(path, "cache.path")?;
        self.cache_resolved = CacheConfig {
            path: config_dir.join(path),
        };
        Ok(())
    }
}
