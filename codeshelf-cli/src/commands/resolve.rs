//! Resolve command - follow a URL's redirects without recording it.

use anyhow::Result;
use clap::Args;
use codeshelf_core::extract_link;
use url::Url;

use crate::commands::InvalidInput;
use crate::context::AppContext;
use crate::output::{JsonFormatter, ResolutionOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the resolve command.
#[derive(Args)]
pub struct ResolveArgs {
    /// URL (or text containing one) to follow.
    pub url: String,
}

/// Runs the resolve command.
pub async fn run(args: &ResolveArgs, ctx: &AppContext, cli: &Cli) -> Result<()> {
    let link = extract_link(&args.url);
    let start = Url::parse(link)
        .map_err(|e| InvalidInput(format!("Not a URL: {link} ({e})")))?;

    let resolution = ctx.resolver().follow(&start).await?;
    let output = ResolutionOutput::new(&start, &resolution);

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            if cli.quiet {
                println!("{}", output.final_url);
            } else {
                println!("{}", formatter.format_resolution(&output));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&output)?);
        }
    }
    Ok(())
}
