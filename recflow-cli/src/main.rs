//! recflow command-line client.
//!
//! Usage:
//!   recflow --config recflow.toml search article "status=submitted"
//!
//! Logs go to stderr; command output goes to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use recflow_cli::{run, Cli};
use recflow_client::AppContext;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(log_level.into()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let config = cli.client_config()?;
    let ctx = AppContext::from_config(config).context("failed to set up record services")?;
    let mut stdout = std::io::stdout().lock();
    run(&cli, &ctx, &mut stdout).await
}
