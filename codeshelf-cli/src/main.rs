// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! CodeShelf CLI - QR payload sanitizing and shared history from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Show history (newest first)
//! codeshelf
//!
//! # Feed decoded payloads, one per line
//! zbarimg --raw -q photo.png | codeshelf scan
//!
//! # What the share extension does
//! codeshelf share "https://example.com/?utm_source=newsletter"
//!
//! # Follow a short link
//! codeshelf resolve https://bit.ly/demo
//!
//! # JSON output
//! codeshelf history list --format json --pretty
//!
//! # Reprint history whenever another process changes it
//! codeshelf watch
//! ```

mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use codeshelf_fetch::FetchError;
use codeshelf_scan::ScanError;
use codeshelf_store::{LogLevel, SettingsStore};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{clean, config, history, resolve, scan, share, watch};
use context::AppContext;

// ============================================================================
// CLI Definition
// ============================================================================

/// CodeShelf CLI - QR payload sanitizing and shared history.
#[derive(Parser)]
#[command(name = "codeshelf")]
#[command(about = "QR payload sanitizing and shared history CLI")]
#[command(long_about = r#"
CodeShelf turns decoded QR payloads into a clean, shared history.

Web links are followed through their redirects and stripped of
tracking parameters (utm_*, fbclid, gclid, ...) at every hop.
History is shared with other CodeShelf processes through the
group directory.

Examples:
  codeshelf                         # History, newest first
  codeshelf scan --at 52.52,13.40   # Scan payloads from stdin
  codeshelf share "some text"       # Share-extension ingest
  codeshelf clean "https://x.io/?fbclid=1"
  codeshelf --format json history list
"#)]
#[command(version)]
#[command(author = "CodeShelf Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, lists history.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Shared group directory (overrides settings).
    #[arg(long, global = true, env = "CODESHELF_GROUP_DIR")]
    pub group_dir: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory).
    #[arg(long, global = true, env = "CODESHELF_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Scan decoded payloads read from stdin, one per line.
    #[command(visible_alias = "s")]
    Scan(scan::ScanArgs),

    /// Ingest shared text or a URL, like the share extension.
    Share(share::ShareArgs),

    /// Show and edit history.
    #[command(visible_alias = "h")]
    History(history::HistoryArgs),

    /// Follow a URL's redirects and print the sanitized destination.
    #[command(visible_alias = "r")]
    Resolve(resolve::ResolveArgs),

    /// Extract the first link from text and strip tracking parameters.
    Clean(clean::CleanArgs),

    /// Reprint history whenever another process changes it.
    #[command(visible_alias = "w")]
    Watch(watch::WatchArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Invalid input (bad URL, unknown id).
    InvalidInput = 2,
    /// Network resolution failed.
    ResolutionFailed = 3,
    /// Timeout.
    Timeout = 4,
}

impl ExitCode {
    fn for_error(error: &anyhow::Error) -> Self {
        let fetch = error.downcast_ref::<FetchError>().or_else(|| {
            match error.downcast_ref::<ScanError>() {
                Some(ScanError::Resolution(e)) => Some(e),
                _ => None,
            }
        });
        match fetch {
            Some(FetchError::Timeout(_)) => ExitCode::Timeout,
            Some(FetchError::InvalidUrl(_) | FetchError::UnsupportedScheme(_)) => {
                ExitCode::InvalidInput
            }
            Some(_) => ExitCode::ResolutionFailed,
            None if error.is::<commands::InvalidInput>() => ExitCode::InvalidInput,
            None => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: LogLevel) {
    if quiet {
        return; // No logging in quiet mode
    }

    let filter = if verbose {
        EnvFilter::new("codeshelf=debug,info")
    } else {
        EnvFilter::new(format!("codeshelf={level}"))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => SettingsStore::load(path.clone()).await,
        None => SettingsStore::load_default().await,
    };
    setup_logging(cli.verbose, cli.quiet, settings.get().await.log_level);

    let ctx = AppContext::new(settings, cli.group_dir.clone()).await;

    let result = match &cli.command {
        Some(Commands::Scan(args)) => scan::run(args, &ctx, &cli).await,
        Some(Commands::Share(args)) => share::run(args, &ctx, &cli).await,
        Some(Commands::History(args)) => history::run(args, &ctx, &cli).await,
        Some(Commands::Resolve(args)) => resolve::run(args, &ctx, &cli).await,
        Some(Commands::Clean(args)) => clean::run(args, &ctx, &cli),
        Some(Commands::Watch(args)) => watch::run(args, &ctx, &cli).await,
        Some(Commands::Config(args)) => config::run(args, &ctx, &cli).await,
        None => history::run(&history::HistoryArgs::default(), &ctx, &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    std::process::exit(ExitCode::Success as i32);
}
