//! md2conf CLI - Markdown to Confluence storage format converter.
//!
//! Provides commands for:
//! - `convert`: Render a markdown file to a Confluence page body
//! - `status`: Compare rendered files against the metadata cache
//! - `cache`: Inspect and edit the metadata cache

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CacheCommand, ConvertArgs, StatusArgs};
use output::Output;

/// md2conf - Markdown to Confluence converter.
#[derive(Parser)]
#[command(name = "md2conf", version, about)]
struct Cli {
    /// Enable info-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a markdown file to Confluence storage format.
    Convert(ConvertArgs),
    /// Report which files changed since they were last published.
    Status(StatusArgs),
    /// Metadata cache commands.
    #[command(subcommand)]
    Cache(CacheCommand),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Convert(args) => args.execute(),
        Commands::Status(args) => args.execute(),
        Commands::Cache(cmd) => cmd.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
