//! Clean command - offline link extraction and tracking removal.

use anyhow::Result;
use clap::Args;

use crate::commands::InvalidInput;
use crate::context::AppContext;
use crate::output::{CleanOutput, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the clean command.
#[derive(Args)]
pub struct CleanArgs {
    /// Text to clean. Multiple words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,
}

/// Runs the clean command.
pub fn run(args: &CleanArgs, ctx: &AppContext, cli: &Cli) -> Result<()> {
    let input = args.text.join(" ");
    if input.trim().is_empty() {
        return Err(InvalidInput("Nothing to clean".to_string()).into());
    }

    let output = CleanOutput::new(&input, &ctx.filter());

    match cli.format {
        OutputFormat::Text => {
            if cli.quiet {
                println!("{}", output.cleaned);
            } else {
                let formatter = TextFormatter::new(!cli.no_color);
                println!("{}", formatter.format_clean(&output));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&output)?);
        }
    }
    Ok(())
}
