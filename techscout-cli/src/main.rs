//! techscout CLI: terminal interface for the technology research workflow.
//!
//! Runs the four-phase analysis, writes the artifacts to disk, and manages
//! history, settings, configuration and the proxy gateway.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// techscout: market, vendor and hype-cycle research with downloadable artifacts
#[derive(Parser, Debug)]
#[command(name = "techscout", version, about, long_about = None)]
struct Cli {
    /// Workspace directory
    #[arg(short, long, default_value = ".")]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Run a full research analysis for a technology topic
    Research(ResearchArgs),
    /// List completed analyses, most recent first
    History {
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// Manage stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run the credential-injecting proxy gateway
    Serve {
        /// Address to listen on (default: gateway.bind)
        #[arg(long)]
        bind: Option<String>,
    },
}

#[derive(clap::Args, Debug, Default)]
pub(crate) struct ResearchArgs {
    /// Technology topic to analyze
    pub topic: String,

    /// Organization the whitepaper is written for
    #[arg(long)]
    pub organization: Option<String>,

    /// Directory the artifacts are written to (default: research.output_dir)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Model to use for every phase
    #[arg(short, long)]
    pub model: Option<String>,

    /// Provider: anthropic or gateway
    #[arg(long)]
    pub provider: Option<String>,

    /// Gateway endpoint when using the gateway provider
    #[arg(long)]
    pub gateway_url: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum SettingsAction {
    /// Show stored settings
    Show,
    /// Store the organization name used in whitepapers
    SetOrganization {
        /// Organization name
        name: String,
    },
    /// Remove the stored organization name
    ClearOrganization,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Show the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "techscout", "techscout")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from(".techscout").join("logs"));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "techscout.log");
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

    commands::handle_command(cli.command, &workspace, cli.quiet).await
}
