//! fanctl - Command-line interface for fan controller configuration
//!
//! Loads a backend state file into the in-memory backend and lets operators:
//! - Render the current fan configuration
//! - Apply patch documents, optionally switching the thermal profile
//! - Write the reconciled state back to disk

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;
mod error;
mod output;
mod state;

use commands::{apply, show, Session};
use config::CliConfig;
use error::CliResult;

/// fanctl application
#[derive(Parser)]
#[command(name = "fanctl")]
#[command(about = "fanctl - Fan and thermal controller configuration", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FANCTL_CONFIG")]
    config: Option<String>,

    /// Backend state file (YAML, or JSON by extension)
    #[arg(short, long, env = "FANCTL_STATE")]
    state: Option<PathBuf>,

    /// Output format (table, json, yaml)
    #[arg(short, long, default_value = "table")]
    output: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Render the current configuration
    Show,

    /// Apply a patch document
    Apply {
        /// Patch file (JSON)
        patch: PathBuf,

        /// Thermal profile to switch to before applying
        #[arg(short, long)]
        profile: Option<String>,

        /// Write the reconciled state back to the state file
        #[arg(short, long)]
        write: bool,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        output::print_error(&err.to_string());
        std::process::exit(1);
    }
}

async fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Show => {
            let session = Session::open(&config, cli.state)?;
            show::execute(&session, cli.output).await
        }
        Commands::Apply {
            patch,
            profile,
            write,
        } => {
            let session = Session::open(&config, cli.state)?;
            apply::execute(&session, &patch, profile, write, cli.output).await
        }
        Commands::Config => {
            println!("State: {:?}", config.resolve_state_file(cli.state).ok());
            output::print_document(&config.engine, cli.output)
        }
    }
}
