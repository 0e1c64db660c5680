//! Weave CLI - multi-module build orchestrator
//!
//! Entry point for the weave command-line application.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use weave::cli::output::{display_error, OutputConfig};
use weave::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Apply output configuration globally
    let output_config = OutputConfig::new(cli.quiet, cli.json, cli.verbose);
    output_config.apply_global();

    // RUST_LOG wins over the verbosity flags
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(output_config.log_filter())),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    // Run the command and handle errors
    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
