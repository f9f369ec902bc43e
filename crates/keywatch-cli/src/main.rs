//! keywatch CLI - operator dashboard for leaked credential discovery
//!
//! This CLI gives operators a terminal view of a key-discovery server:
//! - Follow scan progress, server logs and counters live
//! - List and delete discovered credentials
//! - Review security findings and approve or reject them
//! - Create public disclosures behind an explicit confirmation
//! - Start and stop the background scan

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod commands;
mod config;
mod error;
mod output;

use commands::{keys, review, scan, stats, watch, Context};
use config::{CliConfig, DEFAULT_ENDPOINT};
use error::CliResult;
use output::print_error;

/// keywatch CLI application
#[derive(Parser)]
#[command(name = "keywatch")]
#[command(about = "keywatch - operator dashboard for leaked credential discovery", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "KEYWATCH_CONFIG")]
    config: Option<String>,

    /// Dashboard server endpoint
    #[arg(short, long, env = "KEYWATCH_ENDPOINT")]
    endpoint: Option<String>,

    /// Identity recorded on review decisions
    #[arg(short, long, env = "KEYWATCH_REVIEWER")]
    reviewer: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Follow stats, logs and the review badge live
    Watch,

    /// Discovered credentials
    #[command(alias = "key")]
    Keys {
        #[command(subcommand)]
        command: keys::KeyCommands,
    },

    /// Security findings awaiting review
    Review {
        #[command(subcommand)]
        command: review::ReviewCommands,
    },

    /// Background scan control
    Scan {
        #[command(subcommand)]
        command: scan::ScanCommands,
    },

    /// Show summary statistics
    Stats,

    /// Show configuration
    Config,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose { "debug" } else { "info" };
    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .without_time()
            .with_writer(std::io::stderr)
            .boxed()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(fmt_layer)
        .init();
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    init_tracing(cli.verbose, cli.log_json || config.log_json);

    let endpoint = cli
        .endpoint
        .or_else(|| config.endpoint.clone())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    let reviewer = cli.reviewer.or_else(|| config.reviewer.clone());

    if let Commands::Config = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => CliConfig::default_config_path()?.display().to_string(),
        };
        println!("Config file: {}", path);
        println!("Endpoint: {}", endpoint);
        println!("Reviewer: {}", reviewer.as_deref().unwrap_or("-"));
        println!("Request timeout: {}s", config.request_timeout().as_secs());
        println!("Sync: {:?}", config.sync);
        return Ok(());
    }

    let ctx = Context::new(endpoint, reviewer, &config, cli.output)?;

    match cli.command {
        Commands::Watch => watch::execute(&ctx).await,
        Commands::Keys { command } => keys::execute(command, &ctx).await,
        Commands::Review { command } => review::execute(command, &ctx).await,
        Commands::Scan { command } => scan::execute(command, &ctx).await,
        Commands::Stats => stats::execute(&ctx).await,
        Commands::Config => Ok(()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}
