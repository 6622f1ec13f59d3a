//! iamledger CLI - operator harness for the policy ledger.
//!
//! Hosts the chaincode dispatcher over a local key-value store so operators
//! can initialize a ledger, run invoke and query operations, and verify the
//! access log chain.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod theme;

use commands::{config, ledger};
use theme::Theme;

/// iamledger - tamper-evident authorization ledger
#[derive(Parser)]
#[command(name = "iamledger")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a configuration file layered over the system and user files
    #[arg(short, long, global = true, env = "IAMLEDGER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the ledger tables (once per ledger)
    Init,

    /// Run a state-changing operation
    Invoke {
        /// Operation name (e.g. policycreate)
        operation: String,
        /// Operation arguments, in order
        args: Vec<String>,
    },

    /// Run a read-only operation
    Query {
        /// Operation name (e.g. policy)
        operation: String,
        /// Operation arguments, in order
        args: Vec<String>,
    },

    /// List the operations accepted by invoke and query
    Operations,

    /// Verify the access log hash chain
    Verify,

    /// View configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolved = iamledger_config::Config::load(cli.config.as_deref());

    let log_config = match &resolved {
        Ok(r) => {
            let mut lc = iamledger_telemetry::LogConfig::from(&r.config.logging);
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        Err(_) => {
            let level = if cli.verbose { "debug" } else { "info" };
            iamledger_telemetry::LogConfig::new(level)
        },
    };
    if let Err(e) = iamledger_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let resolved = resolved?;

    if let Commands::Config {
        command: ConfigCommands::Show,
    } = &cli.command
    {
        return config::show_config(&resolved);
    }

    let session = ledger::Session::open(&resolved.config)?;
    let outcome = match &cli.command {
        Commands::Init => ledger::run_init(&session),
        Commands::Invoke { operation, args } => ledger::run_invoke(&session, operation, args),
        Commands::Query { operation, args } => ledger::run_query(&session, operation, args),
        Commands::Operations => {
            ledger::list_operations(&session);
            Ok(())
        },
        Commands::Verify => ledger::run_verify(&session),
        Commands::Config { .. } => Ok(()),
    };
    session.close().await?;

    if let Err(e) = &outcome {
        eprintln!("{}", Theme::error(&format!("{e:#}")));
    }
    outcome
}
