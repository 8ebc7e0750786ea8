//! `md2conf cache` subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use md2conf_cache::MetadataCache;
use md2conf_config::{CliSettings, Config};

use super::open_cache;
use crate::error::CliError;
use crate::output::Output;

/// Metadata cache subcommands.
#[derive(Subcommand)]
pub(crate) enum CacheCommand {
    /// List cached document keys.
    List(CacheArgs),
    /// Show the record stored for a document.
    Show(KeyArgs),
    /// Forget a document.
    Remove(KeyArgs),
}

/// Arguments shared by all cache subcommands.
#[derive(Args)]
pub(crate) struct CacheArgs {
    /// Path to configuration file (default: auto-discover md2conf.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Metadata cache file (overrides config).
    #[arg(long, value_name = "PATH")]
    cache: Option<PathBuf>,
}

/// Arguments for subcommands taking a cache key.
#[derive(Args)]
pub(crate) struct KeyArgs {
    /// Document key (markdown path relative to the config file).
    key: String,

    #[command(flatten)]
    common: CacheArgs,
}

impl CacheCommand {
    /// Execute the cache subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache cannot be read or written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        match self {
            Self::List(args) => {
                let cache = args.open()?;
                let mut keys = cache.keys();
                keys.sort();
                for key in keys {
                    output.data(&key)?;
                }
            }
            Self::Show(args) => {
                let cache = args.common.open()?;
                let record = cache.load(&args.key);
                if record.is_new() {
                    return Err(CliError::Validation(format!("no cache record for {}", args.key)));
                }
                output.data(&format!("id: {}", record.page_id.as_deref().unwrap_or("-")))?;
                output.data(&format!("title: {}", record.title))?;
                output.data(&format!("sha256: {}", record.content_hash))?;
            }
            Self::Remove(args) => {
                let cache = args.common.open()?;
                // Undecodable entries load as empty but can still be removed
                if cache.keys().contains(&args.key) {
                    cache.remove(&args.key)?;
                    output.success(&format!("Removed {}", args.key));
                } else {
                    output.warning(&format!("No cache record for {}", args.key));
                }
            }
        }
        Ok(())
    }
}

impl CacheArgs {
    fn open(&self) -> Result<impl MetadataCache + use<>, CliError> {
        let cli_settings = CliSettings {
            cache_path: self.cache.clone(),
            ..Default::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::info!(path = %config.cache_resolved.path.display(), "Using metadata cache");
        open_cache(&config)
    }
}
