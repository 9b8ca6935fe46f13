use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chromlm_client::Analyzer;
use chromlm_core::HistoryStats;
use clap::{Parser, Subcommand};
use color_eyre::eyre::eyre;
use tokio::io::AsyncReadExt as _;
use tracing::info;

use crate::context::AppContext;
use crate::messaging::handle_json;
use crate::orchestrator::{Orchestrator, RequestOutcome, Surface};
use crate::render;
use crate::tracing_setup::init_tracing;
use crate::user_config::UserConfig;

/// Check Instagram posts for multi-level-marketing content.
#[derive(Debug, Parser)]
#[command(name = "chromlm", version, about)]
pub struct Cli {
    /// Config file (default: ~/.config/chromlm/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the history and settings records
    #[arg(long, global = true, env = "CHROMLM_STORAGE_DIR")]
    pub storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a post, using the history when it already has a verdict
    Analyze {
        url: String,
        #[arg(long, value_enum, default_value_t = Surface::Popup)]
        surface: Surface,
    },

    /// Report opening a post, subject to the widget and auto-analyze settings
    Visit {
        url: String,
        #[arg(long, value_enum, default_value_t = Surface::Widget)]
        surface: Surface,
    },

    /// List past analyses, newest first
    History {
        #[arg(long)]
        json: bool,
    },

    /// Summarize the history
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Delete the whole history
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show or change the user settings
    #[command(subcommand)]
    Settings(SettingsCommand),

    /// Read one JSON message from stdin and print the JSON response
    Message {
        #[arg(long, value_enum, default_value_t = Surface::Popup)]
        surface: Surface,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    Show,
    /// Set one setting by its JSON name, e.g. `autoAnalyze false`
    Set { key: String, value: String },
}

/// Loads configuration, installs logging, opens storage and runs `cli.command`.
pub async fn run(cli: Cli) -> color_eyre::Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => UserConfig::load_layered(Some(path))?,
        None => UserConfig::load()?,
    };
    if let Some(dir) = cli.storage_dir {
        config.storage_dir = Some(dir);
    }
    let _guards = init_tracing(&config.resolved_storage_dir()?.join("logs"))?;
    info!(endpoint = %config.endpoint, "starting");

    let ctx = Arc::new(AppContext::open(config).await?);
    let orch = Orchestrator::with_http(ctx)?;
    let mut stdout = std::io::stdout().lock();
    execute(&orch, cli.command, &mut stdout).await
}

/// Runs one command against `orch`, writing its output to `out`. Failures
/// of the analysis itself go to stderr and yield a failing exit code.
pub async fn execute<A: Analyzer>(
    orch: &Orchestrator<A>,
    command: Command,
    out: &mut impl Write,
) -> color_eyre::Result<ExitCode> {
    let ctx = orch.context();
    match command {
        Command::Analyze { url, surface } => match orch.request(surface, &url).await {
            Ok(outcome) => write!(out, "{}", render::render_outcome(&outcome))?,
            Err(e) => {
                eprint!("{}", render::render_error(&e));
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Visit { url, surface } => {
            let outcome = match orch.visit(surface, &url).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    eprint!("{}", render::render_error(&e));
                    return Ok(ExitCode::FAILURE);
                }
            };
            let settings = ctx.settings().await;
            match &outcome {
                // Below the notification level: stored quietly.
                RequestOutcome::Analyzed(result) if !settings.should_notify(result) => {
                    writeln!(out, "Analysis saved to history.")?;
                }
                _ => write!(out, "{}", render::render_outcome(&outcome))?,
            }
        }
        Command::History { json } => {
            let history = ctx.ledger().all().await?;
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&history)?)?;
            } else {
                write!(out, "{}", render::render_history(&history))?;
            }
        }
        Command::Stats { json } => {
            let stats = HistoryStats::from_records(&ctx.ledger().all().await?);
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&stats)?)?;
            } else {
                write!(out, "{}", render::render_stats(&stats))?;
            }
        }
        Command::Clear { yes } => {
            if !yes {
                eprintln!("Refusing to clear the history without --yes.");
                return Ok(ExitCode::FAILURE);
            }
            ctx.ledger().clear().await?;
            writeln!(out, "History cleared.")?;
        }
        Command::Settings(SettingsCommand::Show) => {
            write!(out, "{}", render::render_settings(&ctx.settings().await))?;
        }
        Command::Settings(SettingsCommand::Set { key, value }) => {
            let mut settings = ctx.settings().await;
            settings.set_field(&key, &value).map_err(|e| eyre!(e))?;
            orch.update_settings(settings.clone()).await?;
            write!(out, "{}", render::render_settings(&settings))?;
        }
        Command::Message { surface } => {
            let mut raw = String::new();
            tokio::io::stdin().read_to_string(&mut raw).await?;
            writeln!(out, "{}", handle_json(orch, surface, &raw).await?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
