use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use starknet::accounts::{Account, ExecutionEncoding, SingleOwnerAccount};
use starknet::contract::ContractFactory;
use starknet::core::types::contract::{CompiledClass, SierraClass};
use starknet::core::types::{
	BlockId, BlockTag, Call, ExecutionResult, Felt, FunctionCall, ReceiptBlock, StarknetError,
};
use starknet::core::utils::get_selector_from_name;
use starknet::providers::jsonrpc::HttpTransport;
use starknet::providers::{JsonRpcClient, Provider, ProviderError, Url};
use starknet::signers::LocalWallet;
use tracing::{debug, info};

use crate::artifacts::ArtifactPair;
use crate::config::NetworkEndpoint;
use crate::error::ClientError;
use crate::felt::to_hex;
use crate::signer::SigningIdentity;

/// How often a pending transaction's receipt is polled.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub type ReadResult = Result<Vec<Felt>, ClientError>;
pub type WriteResult = Result<Felt, ClientError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclareResult {
	pub class_hash: Felt,
	pub transaction_hash: Felt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployResult {
	pub contract_address: Felt,
	pub transaction_hash: Felt,
}

/// Outcome of a successful declare-and-deploy.  Both halves are always
/// present; a failure in either one fails the whole call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclareDeployResult {
	pub declare: DeclareResult,
	pub deploy: DeployResult,
}

/// The network operations a deployment run needs.
#[async_trait]
pub trait NetworkClient: Send + Sync {
	/// Declare the class and deploy one instance of it, waiting for both
	/// transactions to be included.
	async fn declare_and_deploy(
		&self,
		signer: &SigningIdentity,
		artifacts: &ArtifactPair,
		constructor_args: &[Felt],
	) -> Result<DeclareDeployResult, ClientError>;

	/// Call a read-only entry point against the latest block.
	async fn call_read(&self, address: Felt, entry_point: &str, args: &[Felt]) -> ReadResult;

	/// Submit an invoke transaction and return its hash without waiting.
	async fn call_write(
		&self,
		signer: &SigningIdentity,
		address: Felt,
		entry_point: &str,
		args: &[Felt],
	) -> WriteResult;

	/// Block until the transaction is included in a block.  Reverted
	/// transactions are reported as errors.
	async fn wait_for_transaction(&self, tx_hash: Felt) -> Result<(), ClientError>;
}

/// Builds a network client for an endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
	type Client: NetworkClient;

	async fn connect(&self, endpoint: &NetworkEndpoint) -> Result<Self::Client, ClientError>;
}

/// Connects to a Starknet JSON-RPC node.
#[derive(Debug, Clone, Copy, Default)]
pub struct StarknetConnector;

#[async_trait]
impl Connector for StarknetConnector {
	type Client = StarknetClient;

	async fn connect(&self, endpoint: &NetworkEndpoint) -> Result<StarknetClient, ClientError> {
		StarknetClient::connect(endpoint).await
	}
}

/// Thin wrapper around a starknet-rs JSON-RPC provider.
///
/// Declaring, deploying and invoking go through starknet-rs accounts.
/// Transaction status uses raw JSON-RPC because we only want to show the
/// node's status strings verbatim, whatever RPC version it speaks.
pub struct StarknetClient {
	url: Url,
	chain_id: Felt,
	http: reqwest::Client,
}

impl StarknetClient {
	/// Validate the endpoint URL and fetch the chain id.  An empty or
	/// malformed URL fails before any request is made.
	pub async fn connect(endpoint: &NetworkEndpoint) -> Result<Self, ClientError> {
		let url = parse_rpc_url(&endpoint.rpc_url)?;
		let provider = JsonRpcClient::new(HttpTransport::new(url.clone()));
		let chain_id = provider
			.chain_id()
			.await
			.map_err(|e| ClientError::Endpoint(format!("{url} is unreachable: {e}")))?;
		debug!(%url, chain_id = %to_hex(&chain_id), "connected to RPC node");

		Ok(Self {
			url,
			chain_id,
			http: reqwest::Client::new(),
		})
	}

	pub fn chain_id(&self) -> Felt {
		self.chain_id
	}

	fn provider(&self) -> JsonRpcClient<HttpTransport> {
		JsonRpcClient::new(HttpTransport::new(self.url.clone()))
	}

	fn account(
		&self,
		signer: &SigningIdentity,
	) -> SingleOwnerAccount<JsonRpcClient<HttpTransport>, LocalWallet> {
		SingleOwnerAccount::new(
			self.provider(),
			signer.wallet(),
			signer.address(),
			self.chain_id,
			ExecutionEncoding::New,
		)
	}

	/// Fetch `starknet_getTransactionStatus` as returned by the node.
	pub async fn transaction_status(&self, tx_hash: Felt) -> Result<Value, ClientError> {
		let body = json!({
			"id": 1,
			"jsonrpc": "2.0",
			"method": "starknet_getTransactionStatus",
			"params": { "transaction_hash": to_hex(&tx_hash) }
		});

		let resp: Value = self
			.http
			.post(self.url.clone())
			.json(&body)
			.send()
			.await
			.map_err(|e| ClientError::Rpc(e.to_string()))?
			.json()
			.await
			.map_err(|e| ClientError::Rpc(e.to_string()))?;

		resp.get("result").cloned().ok_or_else(|| {
			let err = resp.get("error").cloned().unwrap_or(Value::Null);
			ClientError::Rpc(format!("starknet_getTransactionStatus: {err}"))
		})
	}
}

#[async_trait]
impl NetworkClient for StarknetClient {
	async fn declare_and_deploy(
		&self,
		signer: &SigningIdentity,
		artifacts: &ArtifactPair,
		constructor_args: &[Felt],
	) -> Result<DeclareDeployResult, ClientError> {
		let class: SierraClass = serde_json::from_value(artifacts.class.raw.clone())
			.map_err(|e| ClientError::Class(format!("contract class: {e}")))?;
		let flattened = class
			.flatten()
			.map_err(|e| ClientError::Class(format!("contract class: {e}")))?;
		let compiled: CompiledClass = serde_json::from_value(artifacts.compiled.clone())
			.map_err(|e| ClientError::Class(format!("compiled class: {e}")))?;
		let compiled_class_hash = compiled
			.class_hash()
			.map_err(|e| ClientError::Class(format!("compiled class hash: {e}")))?;

		let account = self.account(signer);

		info!(class_hash = %to_hex(&flattened.class_hash()), "declaring class");
		let declared = account
			.declare_v3(Arc::new(flattened), compiled_class_hash)
			.send()
			.await
			.map_err(|e| ClientError::Rejected(format!("declare: {e}")))?;
		self.wait_for_transaction(declared.transaction_hash).await?;

		let factory = ContractFactory::new(declared.class_hash, account);
		let deployment = factory.deploy_v3(constructor_args.to_vec(), random_salt(), false);
		let contract_address = deployment.deployed_address();

		info!(address = %to_hex(&contract_address), "deploying contract");
		let deployed = deployment
			.send()
			.await
			.map_err(|e| ClientError::Rejected(format!("deploy: {e}")))?;
		self.wait_for_transaction(deployed.transaction_hash).await?;

		Ok(DeclareDeployResult {
			declare: DeclareResult {
				class_hash: declared.class_hash,
				transaction_hash: declared.transaction_hash,
			},
			deploy: DeployResult {
				contract_address,
				transaction_hash: deployed.transaction_hash,
			},
		})
	}

	async fn call_read(&self, address: Felt, entry_point: &str, args: &[Felt]) -> ReadResult {
		let call = FunctionCall {
			contract_address: address,
			entry_point_selector: selector(entry_point)?,
			calldata: args.to_vec(),
		};
		self.provider()
			.call(call, BlockId::Tag(BlockTag::Latest))
			.await
			.map_err(|e| ClientError::Rpc(format!("{entry_point}: {e}")))
	}

	async fn call_write(
		&self,
		signer: &SigningIdentity,
		address: Felt,
		entry_point: &str,
		args: &[Felt],
	) -> WriteResult {
		let call = Call {
			to: address,
			selector: selector(entry_point)?,
			calldata: args.to_vec(),
		};
		let result = self
			.account(signer)
			.execute_v3(vec![call])
			.send()
			.await
			.map_err(|e| ClientError::Rejected(format!("{entry_point}: {e}")))?;
		Ok(result.transaction_hash)
	}

	async fn wait_for_transaction(&self, tx_hash: Felt) -> Result<(), ClientError> {
		let provider = self.provider();
		loop {
			match provider.get_transaction_receipt(tx_hash).await {
				Ok(receipt) => {
					if let Some(done) =
						settled(tx_hash, &receipt.block, receipt.receipt.execution_result())
					{
						return done;
					}
					debug!(tx = %to_hex(&tx_hash), "transaction still in the pending block");
					tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
				}
				Err(ProviderError::StarknetError(StarknetError::TransactionHashNotFound)) => {
					debug!(tx = %to_hex(&tx_hash), "waiting for transaction");
					tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
				}
				Err(e) => return Err(ClientError::Rpc(e.to_string())),
			}
		}
	}
}

// -- Helpers --

/// Check that `raw` is a usable http(s) URL.
pub fn parse_rpc_url(raw: &str) -> Result<Url, ClientError> {
	let raw = raw.trim();
	if raw.is_empty() {
		return Err(ClientError::Endpoint("RPC URL is empty".into()));
	}
	let url = Url::parse(raw).map_err(|e| ClientError::Endpoint(format!("{raw}: {e}")))?;
	match url.scheme() {
		"http" | "https" => Ok(url),
		other => Err(ClientError::Endpoint(format!(
			"{raw}: unsupported scheme `{other}`"
		))),
	}
}

/// Decide whether a receipt ends the wait.  `None` means keep polling:
/// a successful transaction in the pending block is not yet visible to
/// reads at the latest block.  Reverts are final wherever they land.
fn settled(
	tx_hash: Felt,
	block: &ReceiptBlock,
	execution: &ExecutionResult,
) -> Option<Result<(), ClientError>> {
	match (execution, block) {
		(ExecutionResult::Reverted { reason }, _) => Some(Err(ClientError::Reverted {
			hash: tx_hash,
			reason: reason.clone(),
		})),
		(ExecutionResult::Succeeded, ReceiptBlock::Pending) => None,
		(ExecutionResult::Succeeded, ReceiptBlock::Block { .. }) => Some(Ok(())),
	}
}

fn selector(entry_point: &str) -> Result<Felt, ClientError> {
	get_selector_from_name(entry_point)
		.map_err(|_| ClientError::UnknownEntryPoint(entry_point.to_owned()))
}

/// UDC salts only need to be unique; 31 random bytes always fit a felt.
fn random_salt() -> Felt {
	Felt::from_bytes_be_slice(&rand::random::<[u8; 31]>())
}
