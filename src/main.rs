use anyhow::Result;
use clap::Parser;

mod advisor;
mod chain;
mod cli;
mod config;
mod fleet;
mod monitoring;

use cli::args::Cli;
use cli::context::load_configuration;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_configuration(cli.config.clone())?;
    cli::run(cli, config).await
}
