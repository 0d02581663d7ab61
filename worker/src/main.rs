mod cli;
mod worker;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG manda si está definida
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("worker=debug,kvsync=debug,reqwest=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let coord = worker::connect(&cli)?;
    worker::execute(&coord, cli.command).await
}
