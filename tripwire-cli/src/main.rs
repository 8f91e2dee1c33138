//! Tripwire CLI: terminal triage surface for the incident feed.
//!
//! `watch` follows the live stream with pause/inspect controls on stdin;
//! `snapshot` and `replay` print one-shot list views.

mod commands;
mod render;

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use tripwire_core::{DisplayConfig, IncidentFilter, Severity};

/// Tripwire: live triage of CI/CD and supply-chain security incidents
#[derive(Parser, Debug)]
#[command(name = "tripwire", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (for `.tripwire/config.toml`)
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Detection backend base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Number of incidents on the live surface
    #[arg(long)]
    window_size: Option<usize>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Follow the live feed
    Watch {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Fetch the recent-incidents snapshot and print it
    Snapshot {
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Replay a recorded SSE transcript through the triage engine
    Replay {
        /// Transcript file
        file: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default `.tripwire/config.toml` into the workspace
    Init,
    /// Print the effective configuration
    Show,
}

/// List-view filters shared by the display subcommands.
#[derive(clap::Args, Debug, Default)]
struct FilterArgs {
    /// Only incidents from the last N minutes
    #[arg(long)]
    since: Option<u64>,

    /// Only these kinds (repeatable)
    #[arg(long = "kind")]
    kinds: Vec<String>,

    /// Minimum severity: high, medium, low
    #[arg(long)]
    min_severity: Option<Severity>,

    /// Only this scope (e.g. repo, org, ecosystem)
    #[arg(long)]
    scope: Option<String>,

    /// Only this surface (e.g. credentials, dependencies, ops, automation)
    #[arg(long)]
    surface: Option<String>,

    /// Substring match over title, repository and id
    #[arg(long)]
    query: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self, display: &DisplayConfig) -> IncidentFilter {
        let mut filter = IncidentFilter::new();
        if let Some(minutes) = self.since.or(display.window_minutes) {
            match i64::try_from(minutes).ok().and_then(chrono::Duration::try_minutes) {
                Some(window) => filter = filter.within(window),
                None => warn!(minutes, "Time window out of range; showing all incidents"),
            }
        }
        for kind in &self.kinds {
            filter = filter.kind(kind.as_str());
        }
        if let Some(severity) = self.min_severity {
            filter = filter.min_severity(severity);
        }
        if let Some(scope) = &self.scope {
            filter = filter.scope(scope.as_str());
        }
        if let Some(surface) = &self.surface {
            filter = filter.surface(surface.as_str());
        }
        if let Some(query) = &self.query {
            filter = filter.query(query.as_str());
        }
        filter
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "tripwire", "tripwire")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "tripwire.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let mut config =
        tripwire_core::load_config(Some(&workspace), None).context("Configuration error")?;
    if let Some(base_url) = &cli.base_url {
        config.feed.base_url = base_url.clone();
    }
    if let Some(window_size) = cli.window_size {
        config.attention.window_size = window_size;
    }

    commands::handle_command(cli.command, config, &workspace).await
}
