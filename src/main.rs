//! finance-data-mcp: MCP server exposing market-data tools to AI assistants
//!
//! Speaks line-delimited JSON-RPC over stdio. Logging goes to stderr so
//! stdout stays clean for protocol frames.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use finance_data_mcp::config;
use finance_data_mcp::error::ConfigError;
use finance_data_mcp::mcp::server::McpServer;
use finance_data_mcp::provider::EastMoneyProvider;

/// MCP server exposing market-data tools to AI assistants.
///
/// Provides stock, fund, index, and futures quote tools plus small
/// utilities (echo, calculate, get_time) over stdio.
#[derive(Parser, Debug)]
#[command(name = "finance-data-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the finance-data-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration; a missing file at the default location means
    // built-in defaults, an explicit path must exist.
    let cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if matches!(e, ConfigError::NotFound { .. }) {
                eprintln!("Create one based on config/example-config.json");
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting finance-data-mcp server"
    );

    // Build the market-data provider
    let provider = match EastMoneyProvider::new(&cfg.provider) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            error!(error = %e, "Failed to initialise market-data provider");
            return ExitCode::FAILURE;
        }
    };

    // Create MCP server
    let mut server = McpServer::new(provider);

    info!("MCP server ready, waiting for client connection...");

    // Run the server
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(server.run());

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
