use anyhow::Result;

use crate::cli::{Cli, ConfigCommand};
use crate::commands::{load_config, resolve_endpoint};
use crate::config::{Config, ENV_PRIVATE_KEY};

pub fn run(cli: &Cli, cmd: &ConfigCommand) -> Result<()> {
	match cmd {
		ConfigCommand::Show => show(cli),
		ConfigCommand::Set {
			network,
			sepolia_rpc,
			mainnet_rpc,
			account,
		} => {
			// Only the file contents are saved, never environment overrides.
			let mut config = Config::load()?;
			if let Some(network) = network {
				config.network.default = *network;
			}
			if let Some(url) = sepolia_rpc {
				config.network.sepolia_rpc = url.clone();
			}
			if let Some(url) = mainnet_rpc {
				config.network.mainnet_rpc = url.clone();
			}
			if let Some(address) = account {
				config.signer.address = Some(address.clone());
			}
			config.save()?;
			println!("Saved {}", Config::path()?.display());
			Ok(())
		}
	}
}

fn show(cli: &Cli) -> Result<()> {
	let config = load_config()?;
	let endpoint = resolve_endpoint(cli, &config);

	let address = cli
		.address
		.as_deref()
		.or(config.signer.address.as_deref())
		.unwrap_or("not set");
	let key = if std::env::var(ENV_PRIVATE_KEY).is_ok_and(|k| !k.trim().is_empty()) {
		"set"
	} else {
		"not set"
	};

	println!("Config:  {}", Config::path()?.display());
	println!("Network: {}", endpoint.network);
	println!("RPC:     {}", endpoint.rpc_url);
	println!("Account: {address}");
	println!("Key:     {key} ({ENV_PRIVATE_KEY})");
	Ok(())
}
