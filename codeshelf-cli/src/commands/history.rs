//! History command - list and edit the shared history.

use anyhow::Result;
use clap::{Args, Subcommand};
use codeshelf_core::{CodeRecord, RecordId};
use codeshelf_store::HistoryStore;
use tracing::{debug, info};

use crate::commands::InvalidInput;
use crate::context::AppContext;
use crate::output::{JsonFormatter, RecordOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the history command.
#[derive(Args, Default)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub action: Option<HistoryAction>,
}

/// History actions. Ids may be abbreviated to any unique prefix.
#[derive(Subcommand)]
pub enum HistoryAction {
    /// List records, newest first.
    #[command(visible_alias = "ls")]
    List {
        /// Show pinned records before the rest.
        #[arg(long)]
        pinned_first: bool,

        /// Show at most this many records.
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Create a code from text.
    Add {
        /// Text to encode. Multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Toggle the pinned flag of a record.
    Pin {
        /// Record id or unique prefix.
        id: String,
    },

    /// Replace the text of a record.
    Edit {
        /// Record id or unique prefix.
        id: String,

        /// New text. Multiple words are joined with spaces.
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Delete a record.
    #[command(visible_alias = "rm")]
    Remove {
        /// Record id or unique prefix.
        id: String,
    },

    /// Delete every record.
    Clear,
}

/// Runs the history command.
pub async fn run(args: &HistoryArgs, ctx: &AppContext, cli: &Cli) -> Result<()> {
    let history = ctx.history().await;

    match &args.action {
        None => list(&history, false, None, cli).await,
        Some(HistoryAction::List {
            pinned_first,
            limit,
        }) => list(&history, *pinned_first, *limit, cli).await,
        Some(HistoryAction::Add { text }) => {
            let text = text.join(" ");
            let record = CodeRecord::generated(text, ctx.edit_renderer().as_ref());
            history.add(record.clone()).await?;
            info!(id = %record.id(), "Code created");
            print_record(&record, cli)
        }
        Some(HistoryAction::Pin { id }) => {
            let id = find_id(&history, id).await?;
            let Some(pinned) = history.toggle_pin(id).await? else {
                return Err(InvalidInput(format!("Record {id} is gone")).into());
            };
            debug!(%id, pinned, "Pin toggled");
            print_current(&history, id, cli).await
        }
        Some(HistoryAction::Edit { id, text }) => {
            let id = find_id(&history, id).await?;
            let renderer = ctx.edit_renderer();
            if !history.edit(id, text.join(" "), renderer.as_ref()).await? {
                return Err(InvalidInput(format!("Record {id} is gone")).into());
            }
            print_current(&history, id, cli).await
        }
        Some(HistoryAction::Remove { id }) => {
            let id = find_id(&history, id).await?;
            if !history.delete(id).await? {
                return Err(InvalidInput(format!("Record {id} is gone")).into());
            }
            if !cli.quiet {
                println!("Removed {id}");
            }
            Ok(())
        }
        Some(HistoryAction::Clear) => {
            let removed = history.len().await;
            history.clear().await?;
            if !cli.quiet {
                println!("Removed {removed} records");
            }
            Ok(())
        }
    }
}

async fn list(
    history: &HistoryStore,
    pinned_first: bool,
    limit: Option<usize>,
    cli: &Cli,
) -> Result<()> {
    let mut records = history.sorted(pinned_first).await;
    if let Some(limit) = limit {
        records.truncate(limit);
    }

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            print!("{}", formatter.format_history(&records));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            let output: Vec<RecordOutput> = records.iter().map(RecordOutput::from).collect();
            println!("{}", formatter.format(&output)?);
        }
    }
    Ok(())
}

async fn print_current(history: &HistoryStore, id: RecordId, cli: &Cli) -> Result<()> {
    match history.get(id).await {
        Some(record) => print_record(&record, cli),
        None => Ok(()),
    }
}

fn print_record(record: &CodeRecord, cli: &Cli) -> Result<()> {
    if cli.quiet {
        return Ok(());
    }
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_record(record));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&RecordOutput::from(record))?);
        }
    }
    Ok(())
}

async fn find_id(history: &HistoryStore, prefix: &str) -> Result<RecordId, InvalidInput> {
    let ids: Vec<RecordId> = history.records().await.iter().map(CodeRecord::id).collect();
    match_prefix(&ids, prefix)
}

/// Finds the single id starting with `prefix` (case-insensitive).
fn match_prefix(ids: &[RecordId], prefix: &str) -> Result<RecordId, InvalidInput> {
    let prefix = prefix.trim().to_ascii_lowercase();
    if prefix.is_empty() {
        return Err(InvalidInput("Record id is empty".to_string()));
    }

    let mut matches = ids.iter().filter(|id| id.to_string().starts_with(&prefix));
    match (matches.next(), matches.next()) {
        (Some(id), None) => Ok(*id),
        (None, _) => Err(InvalidInput(format!("No record matches '{prefix}'"))),
        (Some(_), Some(_)) => Err(InvalidInput(format!(
            "'{prefix}' matches more than one record"
        ))),
    }
}
