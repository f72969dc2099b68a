use anyhow::Result;

use crate::cli::{Cli, TxCommand};
use crate::commands::{load_config, resolve_endpoint};
use crate::felt::to_hex;
use crate::rpc::StarknetClient;

pub async fn run(cli: &Cli, cmd: &TxCommand) -> Result<()> {
	let config = load_config()?;
	let endpoint = resolve_endpoint(cli, &config);
	let client = StarknetClient::connect(&endpoint).await?;

	match cmd {
		TxCommand::Status { tx_hash } => {
			let status = client.transaction_status(*tx_hash).await?;
			let field = |name: &str| {
				status
					.get(name)
					.and_then(|v| v.as_str())
					.unwrap_or("unknown")
					.to_owned()
			};
			println!("Transaction: {}", to_hex(tx_hash));
			println!("Finality:    {}", field("finality_status"));
			println!("Execution:   {}", field("execution_status"));
			if let Some(reason) = status.get("failure_reason").and_then(|v| v.as_str()) {
				println!("Reason:      {reason}");
			}
			Ok(())
		}
	}
}
