//! Config command - manage configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use codeshelf_store::{ConflictPolicy, default_config_dir};
use tracing::info;

use crate::context::AppContext;
use crate::output::JsonFormatter;
use crate::{Cli, OutputFormat};

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Config subcommands.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration.
    Show,

    /// Show configuration paths.
    Path,

    /// Set how concurrent history writers are reconciled.
    SetPolicy {
        /// lww (last writer wins) or merge (merge by revision).
        policy: ConflictPolicy,
    },

    /// Add a query parameter name to strip from links.
    Track {
        /// Parameter name, matched case-insensitively.
        name: String,
    },

    /// Reset to defaults.
    Reset,
}

/// Runs the config command.
pub async fn run(args: &ConfigArgs, ctx: &AppContext, cli: &Cli) -> Result<()> {
    match &args.action {
        ConfigAction::Show => show_config(ctx, cli).await,
        ConfigAction::Path => show_paths(ctx, cli),
        ConfigAction::SetPolicy { policy } => set_policy(ctx, *policy).await,
        ConfigAction::Track { name } => add_tracking_param(ctx, name).await,
        ConfigAction::Reset => reset_config(ctx).await,
    }
}

async fn show_config(ctx: &AppContext, cli: &Cli) -> Result<()> {
    let settings = ctx.settings_store.get().await;

    match cli.format {
        OutputFormat::Text => {
            println!("CodeShelf Configuration");
            println!("{}", "─".repeat(40));
            println!();
            println!("Group dir:         {}", settings.group_dir().display());
            println!("History key:       {}", settings.history_key);
            println!("Conflict policy:   {}", settings.conflict_policy);
            println!("Resolve redirects: {}", settings.resolve_redirects);
            println!("Resolve timeout:   {}s", settings.resolve_timeout().as_secs());
            println!("Max redirects:     {}", settings.max_redirects);
            println!("Record location:   {}", settings.record_location);
            println!("Render images:     {}", settings.render_images);
            println!("Log level:         {}", settings.log_level);
            if !settings.extra_tracking_params.is_empty() {
                println!();
                println!("Extra tracking parameters:");
                for name in &settings.extra_tracking_params {
                    println!("  • {name}");
                }
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&settings)?);
        }
    }

    Ok(())
}

fn show_paths(ctx: &AppContext, cli: &Cli) -> Result<()> {
    let config_dir = default_config_dir();
    let settings_path = ctx.settings_store.path();
    let group_dir = ctx.settings.group_dir();

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration Paths");
            println!("{}", "─".repeat(40));
            println!();
            println!("Config dir:    {}", config_dir.display());
            println!("Settings file: {}", settings_path.display());
            println!("Group dir:     {}", group_dir.display());
        }
        OutputFormat::Json => {
            let paths = serde_json::json!({
                "config_dir": config_dir.display().to_string(),
                "settings_file": settings_path.display().to_string(),
                "group_dir": group_dir.display().to_string(),
            });
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&paths)?);
        }
    }

    Ok(())
}

async fn set_policy(ctx: &AppContext, policy: ConflictPolicy) -> Result<()> {
    ctx.settings_store.set_conflict_policy(policy).await;
    ctx.settings_store.save().await?;

    info!(%policy, "Conflict policy updated");
    println!("Conflict policy set to: {policy}");

    Ok(())
}

async fn add_tracking_param(ctx: &AppContext, name: &str) -> Result<()> {
    let name = name.trim().to_ascii_lowercase();
    if name.is_empty() {
        anyhow::bail!("Parameter name is empty");
    }

    let mut added = false;
    ctx.settings_store
        .update(|s| {
            if !s.extra_tracking_params.iter().any(|p| p.eq_ignore_ascii_case(&name)) {
                s.extra_tracking_params.push(name.clone());
                added = true;
            }
        })
        .await;
    ctx.settings_store.save().await?;

    if added {
        info!(param = %name, "Tracking parameter added");
        println!("Now stripping: {name}");
    } else {
        println!("Already stripping: {name}");
    }

    Ok(())
}

async fn reset_config(ctx: &AppContext) -> Result<()> {
    ctx.settings_store.reset().await;
    ctx.settings_store.save().await?;

    info!(path = %ctx.settings_store.path().display(), "Settings reset");
    println!("Configuration reset to defaults");

    Ok(())
}
