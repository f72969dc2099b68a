use std::fmt;
use std::path::PathBuf;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::error::DeployError;
use crate::signer::PrivateKey;

pub const ENV_NETWORK: &str = "STARKNET_NETWORK";
pub const ENV_SEPOLIA_URL: &str = "SEPOLIA_NODE_URL";
pub const ENV_MAINNET_URL: &str = "MAINNET_NODE_URL";
pub const ENV_ACCOUNT_ADDRESS: &str = "STARKNET_ACCOUNT_ADDRESS";
pub const ENV_PRIVATE_KEY: &str = "STARKNET_PRIVATE_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Network {
	/// Starknet Sepolia testnet.
	#[value(alias = "testnet")]
	Sepolia,
	/// Starknet mainnet.
	Mainnet,
}

impl Network {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Sepolia => "sepolia",
			Self::Mainnet => "mainnet",
		}
	}

	/// Interpret a `STARKNET_NETWORK` value.  Only `mainnet` selects
	/// mainnet; anything else means the testnet.
	pub fn from_env_value(value: &str) -> Self {
		if value.trim().eq_ignore_ascii_case("mainnet") {
			Self::Mainnet
		} else {
			Self::Sepolia
		}
	}
}

impl fmt::Display for Network {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
	pub network: NetworkConfig,
	pub signer: SignerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
	pub default: Network,
	pub sepolia_rpc: String,
	pub mainnet_rpc: String,
}

/// Only the account address is ever persisted.  The private key comes
/// from the environment on every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
	pub address: Option<String>,
}

/// The RPC endpoint a run talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEndpoint {
	pub network: Network,
	pub rpc_url: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			network: NetworkConfig {
				default: Network::Sepolia,
				sepolia_rpc: "https://starknet-sepolia.public.blastapi.io".into(),
				mainnet_rpc: "https://starknet-mainnet.public.blastapi.io".into(),
			},
			signer: SignerConfig { address: None },
		}
	}
}

impl Config {
	/// Directory where CLI state is stored (~/.starknet-deploy/).
	pub fn dir() -> anyhow::Result<PathBuf> {
		dirs::home_dir()
			.map(|home| home.join(".starknet-deploy"))
			.ok_or_else(|| anyhow!("could not determine home directory"))
	}

	/// Path to the config file.
	pub fn path() -> anyhow::Result<PathBuf> {
		Ok(Self::dir()?.join("config.toml"))
	}

	/// Load config from disk, falling back to defaults if no file exists.
	pub fn load() -> anyhow::Result<Self> {
		let path = Self::path()?;
		if path.exists() {
			let content = std::fs::read_to_string(&path)?;
			Ok(toml::from_str(&content)?)
		} else {
			Ok(Self::default())
		}
	}

	/// Persist the current config to disk, creating the directory if needed.
	pub fn save(&self) -> anyhow::Result<()> {
		let path = Self::path()?;
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)?;
		}
		std::fs::write(&path, toml::to_string_pretty(self)?)?;
		Ok(())
	}

	/// Overlay values found in the environment.  `lookup` is usually
	/// `std::env::var(..).ok()`; tests pass a closure over a map.
	pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
		if let Some(network) = lookup(ENV_NETWORK) {
			self.network.default = Network::from_env_value(&network);
		}
		if let Some(url) = lookup(ENV_SEPOLIA_URL) {
			self.network.sepolia_rpc = url;
		}
		if let Some(url) = lookup(ENV_MAINNET_URL) {
			self.network.mainnet_rpc = url;
		}
		if let Some(address) = lookup(ENV_ACCOUNT_ADDRESS) {
			self.signer.address = Some(address);
		}
	}

	/// Return the RPC URL configured for `network`.
	pub fn rpc_url(&self, network: Network) -> &str {
		match network {
			Network::Sepolia => &self.network.sepolia_rpc,
			Network::Mainnet => &self.network.mainnet_rpc,
		}
	}

	pub fn endpoint(&self, network: Network) -> NetworkEndpoint {
		NetworkEndpoint {
			network,
			rpc_url: self.rpc_url(network).to_owned(),
		}
	}
}

/// Everything a deployment run needs to know about where and as whom it
/// runs.  Built once at startup and handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct Settings {
	pub endpoint: NetworkEndpoint,
	pub signer_address: String,
	pub private_key: PrivateKey,
}

impl Settings {
	pub fn new(
		endpoint: NetworkEndpoint,
		signer_address: Option<String>,
		private_key: Option<String>,
	) -> Result<Self, DeployError> {
		let signer_address = signer_address
			.filter(|a| !a.trim().is_empty())
			.ok_or_else(|| {
				DeployError::Config(format!(
					"no account address configured (set {ENV_ACCOUNT_ADDRESS} or pass --address)"
				))
			})?;
		let private_key = private_key
			.filter(|k| !k.trim().is_empty())
			.map(PrivateKey::new)
			.ok_or_else(|| {
				DeployError::Config(format!("no private key configured (set {ENV_PRIVATE_KEY})"))
			})?;

		Ok(Self {
			endpoint,
			signer_address,
			private_key,
		})
	}
}
