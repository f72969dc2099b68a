use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use starknet_deploy::cli::{Cli, Command};
use starknet_deploy::commands;

#[tokio::main]
async fn main() -> Result<()> {
	// A missing .env is fine; the environment may already be set.
	dotenvy::dotenv().ok();

	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
		)
		.with_writer(std::io::stderr)
		.init();

	let cli = Cli::parse();

	match &cli.command {
		Command::Deploy(args) => commands::deploy::run(&cli, args).await,
		Command::Config { command } => commands::config::run(&cli, command),
		Command::Tx { command } => commands::tx::run(&cli, command).await,
	}
}
