use serde::Deserialize;
use starknet::core::types::Felt;

use crate::error::ClientError;
use crate::rpc::{NetworkClient, ReadResult, WriteResult};
use crate::signer::SigningIdentity;

/// Whether an entry point may change contract state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateMutability {
	External,
	View,
}

impl StateMutability {
	fn as_str(&self) -> &'static str {
		match self {
			Self::External => "external",
			Self::View => "view",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AbiParam {
	pub name: String,
	#[serde(rename = "type")]
	pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AbiOutput {
	#[serde(rename = "type")]
	pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntryPoint {
	pub name: String,
	#[serde(default)]
	pub inputs: Vec<AbiParam>,
	#[serde(default)]
	pub outputs: Vec<AbiOutput>,
	pub state_mutability: StateMutability,
}

/// Sierra ABI items.  Only functions matter for invocation; everything
/// else (structs, events, impls, the constructor) is skipped.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AbiItem {
	Function(EntryPoint),
	Interface { items: Vec<AbiItem> },
	#[serde(other)]
	Other,
}

/// The callable surface of a contract class.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Abi {
	entry_points: Vec<EntryPoint>,
}

impl Abi {
	/// Parse the `abi` member of a Sierra contract class.  Compilers emit
	/// it either as a JSON array or as a string holding that array.
	pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
		let items: Vec<AbiItem> = match value {
			serde_json::Value::String(s) => serde_json::from_str(s)?,
			other => serde_json::from_value(other.clone())?,
		};

		let mut entry_points = Vec::new();
		collect(items, &mut entry_points);
		Ok(Self { entry_points })
	}

	pub fn entry_point(&self, name: &str) -> Option<&EntryPoint> {
		self.entry_points.iter().find(|ep| ep.name == name)
	}

	pub fn entry_points(&self) -> impl Iterator<Item = &EntryPoint> {
		self.entry_points.iter()
	}

	fn require(&self, name: &str, expected: StateMutability) -> Result<&EntryPoint, ClientError> {
		let ep = self
			.entry_point(name)
			.ok_or_else(|| ClientError::UnknownEntryPoint(name.to_owned()))?;
		if ep.state_mutability != expected {
			return Err(ClientError::Mutability {
				name: name.to_owned(),
				expected: expected.as_str(),
				actual: ep.state_mutability.as_str(),
			});
		}
		Ok(ep)
	}
}

fn collect(items: Vec<AbiItem>, out: &mut Vec<EntryPoint>) {
	for item in items {
		match item {
			AbiItem::Function(ep) => out.push(ep),
			AbiItem::Interface { items } => collect(items, out),
			AbiItem::Other => {}
		}
	}
}

/// A deployed contract instance reachable through a network client.
///
/// Entry points are checked against the ABI before anything is sent.
/// Writes return as soon as the transaction is accepted by the node;
/// waiting for inclusion is left to the caller.
pub struct ContractHandle<'a, C: ?Sized> {
	abi: Abi,
	address: Felt,
	client: &'a C,
	signer: &'a SigningIdentity,
}

impl<'a, C: NetworkClient + ?Sized> ContractHandle<'a, C> {
	pub fn new(abi: Abi, address: Felt, client: &'a C, signer: &'a SigningIdentity) -> Self {
		Self {
			abi,
			address,
			client,
			signer,
		}
	}

	pub fn address(&self) -> Felt {
		self.address
	}

	pub fn abi(&self) -> &Abi {
		&self.abi
	}

	/// Call a `view` entry point.
	pub async fn call(&self, entry_point: &str, args: &[Felt]) -> ReadResult {
		self.abi.require(entry_point, StateMutability::View)?;
		self.client.call_read(self.address, entry_point, args).await
	}

	/// Submit a transaction to an `external` entry point and return its hash.
	pub async fn invoke(&self, entry_point: &str, args: &[Felt]) -> WriteResult {
		self.abi.require(entry_point, StateMutability::External)?;
		self.client
			.call_write(self.signer, self.address, entry_point, args)
			.await
	}
}
