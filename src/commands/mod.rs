pub mod config;
pub mod deploy;
pub mod tx;

use crate::cli::Cli;
use crate::config::{Config, Network, NetworkEndpoint};

/// Load the config file and overlay the process environment.
pub fn load_config() -> anyhow::Result<Config> {
	let mut config = Config::load()?;
	config.apply_env(|key| std::env::var(key).ok());
	Ok(config)
}

/// Network from the CLI flag, else the environment/config default.
pub fn resolve_network(cli: &Cli, config: &Config) -> Network {
	cli.network.unwrap_or(config.network.default)
}

/// Endpoint for the selected network, with the CLI URL override applied.
pub fn resolve_endpoint(cli: &Cli, config: &Config) -> NetworkEndpoint {
	let mut endpoint = config.endpoint(resolve_network(cli, config));
	if let Some(url) = &cli.rpc_url {
		endpoint.rpc_url = url.clone();
	}
	endpoint
}
