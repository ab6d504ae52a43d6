//! Scan command - run the scan pipeline over payloads from stdin.
//!
//! Each input line is one decoded payload. An empty line stands for a frame
//! that could not be decoded.

use anyhow::Result;
use clap::Args;
use codeshelf_core::{GeoPoint, LocationProvider};
use codeshelf_scan::{FixedLocation, ScanEvent, ScanPipeline};
use codeshelf_store::HistoryStore;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::context::AppContext;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Device location to attach to scanned codes, as "lat,lon".
    #[arg(long, value_name = "LAT,LON")]
    pub at: Option<GeoPoint>,

    /// Do not follow redirects; only strip tracking parameters.
    #[arg(long)]
    pub no_resolve: bool,
}

/// How session events are printed.
#[derive(Debug, Clone, Copy)]
struct EventSink {
    format: OutputFormat,
    pretty: bool,
    use_colors: bool,
    quiet: bool,
}

impl From<&Cli> for EventSink {
    fn from(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            pretty: cli.pretty,
            use_colors: !cli.no_color,
            quiet: cli.quiet,
        }
    }
}

/// Runs the scan command.
pub async fn run(args: &ScanArgs, ctx: &AppContext, cli: &Cli) -> Result<()> {
    let history = ctx.history().await;
    let input = BufReader::new(tokio::io::stdin());
    scan(args, ctx, history, input, EventSink::from(cli)).await?;
    Ok(())
}

/// Feeds every line of `input` through a scan session over `history`.
///
/// Sibling saves are reloaded while the session runs, so records they add
/// survive our later saves. Returns the number of lines read.
async fn scan<R>(
    args: &ScanArgs,
    ctx: &AppContext,
    history: HistoryStore,
    input: R,
    sink: EventSink,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let sync = history.spawn_external_sync()?;
    let location = args
        .at
        .map(|point| Arc::new(FixedLocation(point)) as Arc<dyn LocationProvider>);

    let mut pipeline = ScanPipeline::new(
        ctx.recorder(history, location),
        Arc::new(ctx.resolver()),
        ctx.opener(),
    )
    .with_filter(ctx.filter());
    if args.no_resolve || !ctx.settings.resolve_redirects {
        pipeline = pipeline.without_resolution();
    }

    let session = pipeline.start();
    let printer = tokio::spawn(print_events(session.subscribe(), sink));

    let mut lines = input.lines();
    let mut count = 0usize;
    let fed: Result<()> = async {
        while let Some(line) = lines.next_line().await? {
            let payload = line.trim_end_matches('\r');
            if payload.trim().is_empty() {
                session.decode_failed().await?;
            } else {
                session.payload_decoded(payload).await?;
            }
            count += 1;
        }
        debug!(count, "Input exhausted, waiting for pending resolutions");
        session.flush().await?;
        Ok(())
    }
    .await;

    session.stop().await;
    sync.abort();
    fed?;
    printer.await?;
    info!(count, "Scan finished");
    Ok(count)
}

async fn print_events(mut events: broadcast::Receiver<ScanEvent>, sink: EventSink) {
    let text = TextFormatter::new(sink.use_colors);
    let json = JsonFormatter::new(sink.pretty);

    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Event printer lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        if sink.quiet && !matches!(event, ScanEvent::Recorded(_)) {
            continue;
        }
        match sink.format {
            OutputFormat::Text => println!("{}", text.format_event(&event)),
            OutputFormat::Json => match json.format_event(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Error: {e}"),
            },
        }
    }
}
