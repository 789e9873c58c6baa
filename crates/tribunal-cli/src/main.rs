//! # tribunal CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tribunal_cli::config::{run_config, ConfigArgs};
use tribunal_cli::serve::{run_serve, ServeArgs};
use tribunal_cli::spec::{run_spec, SpecArgs};

/// Tribunal CLI
///
/// Dispute-hearing lifecycle and time negotiation services: run the API
/// server, validate configuration, and export the OpenAPI spec.
#[derive(Parser, Debug)]
#[command(name = "tribunal", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to the YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines instead of human-readable output.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the API server.
    Serve(ServeArgs),

    /// Parse and validate a configuration file.
    Config(ConfigArgs),

    /// Print the OpenAPI specification to stdout.
    Spec(SpecArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level; RUST_LOG overrides.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    let result = match cli.command {
        Commands::Serve(args) => run_serve(&args, cli.config.as_ref()).await,
        Commands::Config(args) => run_config(&args),
        Commands::Spec(args) => run_spec(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
