//! Sentry Console - operator tool for the Sentry video analysis service
//!
//! One-shot commands for session control, reports and alerts, plus an
//! interactive console mode that keeps a session alive across commands.

mod commands;
mod config;
mod console;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sentry_client::SentryClient;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "sentry-console")]
#[command(author, version, about = "Sentry video surveillance console")]
#[command(propagate_version = true)]
struct Cli {
    /// Service URL
    #[arg(
        short,
        long,
        env = "SENTRY_SERVER",
        default_value = "http://localhost:5000"
    )]
    server: String,

    /// Configuration file path
    #[arg(short, long, env = "SENTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive session console
    Console,

    /// Start a live camera session
    Start {
        /// Local camera device index
        #[arg(long, conflicts_with = "url")]
        device: Option<u32>,

        /// Network stream address (RTSP/HTTP)
        #[arg(long)]
        url: Option<String>,
    },

    /// Stop the live camera session
    Stop,

    /// Generate a report for the running camera session
    Report,

    /// Show recent alerts
    Alerts {
        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Analyze a video file
    Analyze {
        /// Video file path
        file: PathBuf,
    },

    /// List generated reports
    Reports {
        /// Filter by kind: upload or camera
        #[arg(long)]
        kind: Option<String>,

        /// Case-insensitive summary search
        #[arg(long)]
        search: Option<String>,
    },

    /// Download a report PDF
    Download {
        /// Report file name as listed
        filename: String,

        /// Target path (defaults to the report file name)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Delete a report
    Delete {
        /// Report ID
        id: i64,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(Some(&cli.server), Some(cli.output.into()), cli.no_color);

    // Create output context
    let ctx = OutputContext::new(cli.output, merged.no_color, cli.quiet);

    // Execute command
    match &cli.command {
        Commands::Console => {
            let client = create_client(&merged.server)?;
            console::run(client, &ctx).await?;
        }

        Commands::Start { device, url } => {
            let client = create_client(&merged.server)?;
            commands::start(&client, *device, url.as_deref(), &ctx).await?;
        }

        Commands::Stop => {
            let client = create_client(&merged.server)?;
            commands::stop(&client, &ctx).await?;
        }

        Commands::Report => {
            let client = create_client(&merged.server)?;
            commands::report(&client, &ctx).await?;
        }

        Commands::Alerts { watch } => {
            let client = create_client(&merged.server)?;
            commands::alerts(&client, *watch, &ctx).await?;
        }

        Commands::Analyze { file } => {
            let client = create_client(&merged.server)?;
            commands::analyze(&client, file, &ctx).await?;
        }

        Commands::Reports { kind, search } => {
            let client = create_client(&merged.server)?;
            commands::reports(&client, kind.as_deref(), search.as_deref(), &ctx).await?;
        }

        Commands::Download { filename, out } => {
            let client = create_client(&merged.server)?;
            commands::download(&client, filename, out.as_deref(), &ctx).await?;
        }

        Commands::Delete { id, yes } => {
            let client = create_client(&merged.server)?;
            commands::delete(&client, *id, *yes, &ctx).await?;
        }

        Commands::Health => {
            let client = create_client(&merged.server)?;
            commands::health(&client, &ctx).await?;
        }
    }

    Ok(())
}

/// Create a Sentry client for the given service URL
fn create_client(server: &str) -> Result<SentryClient> {
    SentryClient::new(server).context("Failed to create Sentry client")
}

// Implement conversion for OutputFormat to string (for config merge)
impl From<OutputFormat> for &str {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}
