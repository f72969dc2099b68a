use std::path::PathBuf;

use clap::{Parser, Subcommand};
use starknet::core::types::Felt;

use crate::config::Network;
use crate::felt::parse_felt;

#[derive(Parser)]
#[command(
	name = "starknet-deploy",
	about = "Declare, deploy, smoke-test and record a Starknet contract.",
	version
)]
pub struct Cli {
	/// Network to connect to (defaults to STARKNET_NETWORK, then the config file).
	#[arg(long, global = true)]
	pub network: Option<Network>,

	/// Override RPC endpoint URL.
	#[arg(long, global = true)]
	pub rpc_url: Option<String>,

	/// Override the deploying account address.
	#[arg(long, global = true)]
	pub address: Option<String>,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
	/// Declare and deploy a compiled contract, then verify and record it.
	Deploy(DeployArgs),

	/// Inspect or update the persisted configuration.
	Config {
		#[command(subcommand)]
		command: ConfigCommand,
	},

	/// Check transaction status on-chain.
	Tx {
		#[command(subcommand)]
		command: TxCommand,
	},
}

#[derive(clap::Args)]
pub struct DeployArgs {
	/// Scarb package name (artifact file prefix).
	#[arg(long, default_value = "example")]
	pub package: String,

	/// Contract name inside the package.
	#[arg(long, default_value = "HelloStarknet")]
	pub contract: String,

	/// Directory holding the compiled artifacts.
	#[arg(long, default_value = "target/dev")]
	pub target_dir: PathBuf,

	/// Explicit path to the Sierra contract class.
	#[arg(long)]
	pub contract_class: Option<PathBuf>,

	/// Explicit path to the compiled (CASM) contract class.
	#[arg(long)]
	pub compiled_class: Option<PathBuf>,

	/// Constructor argument (hex or decimal felt). Repeat for each argument.
	#[arg(long = "constructor-arg", value_parser = parse_felt_arg)]
	pub constructor_args: Vec<Felt>,

	/// Where to write the deployment record.
	#[arg(long)]
	pub output: Option<PathBuf>,

	/// Skip the post-deployment smoke test.
	#[arg(long)]
	pub no_smoke_test: bool,

	/// View entry point read by the smoke test.
	#[arg(long, default_value = "get_balance")]
	pub getter: String,

	/// External entry point called by the smoke test.
	#[arg(long, default_value = "increase_balance")]
	pub setter: String,

	/// Amount passed to the setter.
	#[arg(long, default_value = "100", value_parser = parse_felt_arg)]
	pub amount: Felt,

	/// Value the getter must return after the setter call.
	#[arg(long, default_value = "100", value_parser = parse_felt_arg)]
	pub expected: Felt,
}

// -- Config subcommands --

#[derive(Subcommand)]
pub enum ConfigCommand {
	/// Show the effective configuration.
	Show,

	/// Persist values to the config file.
	Set {
		/// Default network.
		#[arg(long)]
		network: Option<Network>,

		/// Sepolia RPC endpoint.
		#[arg(long)]
		sepolia_rpc: Option<String>,

		/// Mainnet RPC endpoint.
		#[arg(long)]
		mainnet_rpc: Option<String>,

		/// Account address used for deployments.
		#[arg(long)]
		account: Option<String>,
	},
}

// -- Tx subcommands --

#[derive(Subcommand)]
pub enum TxCommand {
	/// Check finality and execution status of a transaction.
	Status {
		/// Transaction hash (0x-prefixed).
		#[arg(value_parser = parse_felt_arg)]
		tx_hash: Felt,
	},
}

fn parse_felt_arg(value: &str) -> Result<Felt, String> {
	parse_felt(value)
}
