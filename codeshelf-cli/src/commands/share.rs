//! Share command - ingest text the way the share extension does.

use anyhow::Result;
use clap::Args;
use codeshelf_scan::ShareIngestPipeline;
use tracing::info;

use crate::commands::InvalidInput;
use crate::context::AppContext;
use crate::output::{JsonFormatter, RecordOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the share command.
#[derive(Args)]
pub struct ShareArgs {
    /// Shared text or URL. Multiple words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

/// Runs the share command.
pub async fn run(args: &ShareArgs, ctx: &AppContext, cli: &Cli) -> Result<()> {
    let text = args.text.join(" ");
    if text.trim().is_empty() {
        return Err(InvalidInput("Nothing to share".to_string()).into());
    }

    let history = ctx.history().await;
    let pipeline =
        ShareIngestPipeline::new(ctx.recorder(history, None), ctx.opener()).with_filter(ctx.filter());
    let record = pipeline.ingest(&text).await?;
    info!(id = %record.id(), "Shared item recorded");

    if cli.quiet {
        return Ok(());
    }
    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_record(&record));
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&RecordOutput::from(&record))?);
        }
    }
    Ok(())
}
