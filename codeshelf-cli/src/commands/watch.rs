//! Watch command - follow the shared history live.
//!
//! The view is reprinted whenever any process sharing the group directory
//! saves the history.

use anyhow::Result;
use clap::Args;
use codeshelf_store::HistoryStore;
use std::io::{Write, stdout};
use tracing::{debug, info};

use crate::Cli;
use crate::context::AppContext;
use crate::output::TextFormatter;

/// Arguments for watch command.
#[derive(Args)]
pub struct WatchArgs {
    /// Show pinned records before the rest.
    #[arg(long)]
    pub pinned_first: bool,

    /// Show at most this many records.
    #[arg(long, short = 'n', default_value = "20")]
    pub limit: usize,
}

/// Runs the watch command.
pub async fn run(args: &WatchArgs, ctx: &AppContext, cli: &Cli) -> Result<()> {
    let history = ctx.history().await;
    let sync = history.spawn_external_sync()?;
    let mut changes = history.subscribe();

    info!(group_dir = %ctx.settings.group_dir().display(), "Starting watch mode");

    let formatter = TextFormatter::new(!cli.no_color);
    render(&history, &formatter, args).await?;

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                debug!(version = *changes.borrow_and_update(), "History changed");
                render(&history, &formatter, args).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Watch interrupted");
                break;
            }
        }
    }

    sync.abort();
    Ok(())
}

async fn render(history: &HistoryStore, formatter: &TextFormatter, args: &WatchArgs) -> Result<()> {
    // Clear screen
    print!("\x1b[2J\x1b[H");
    stdout().flush()?;

    let mut records = history.sorted(args.pinned_first).await;
    let total = records.len();
    records.truncate(args.limit);

    let now = chrono::Local::now();
    println!(
        "CodeShelf Watch Mode - {} (revision {}, {} records)",
        now.format("%H:%M:%S"),
        history.revision().await,
        total
    );
    println!("{}", "─".repeat(50));
    println!();
    print!("{}", formatter.format_history(&records));
    println!();
    println!("Press Ctrl+C to exit");
    Ok(())
}
