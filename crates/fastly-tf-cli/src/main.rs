mod cli;
mod commands;
mod output;

use anyhow::Result;
use cli::{Cli, Command};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Flatten { service, version, output } => {
            commands::flatten(cli.config, service, version, output).await
        }
        Command::Render { scenario, name, gcs_name } => commands::render(scenario, name, gcs_name),
        Command::Test { scenario, engine, terraform_bin, workspace, gcs_env } => {
            commands::test(cli.config, scenario, engine, terraform_bin, workspace, gcs_env).await
        }
    }
}
