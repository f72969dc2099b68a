use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use starknet::core::types::Felt;

use crate::config::Network;
use crate::error::RecordError;
use crate::felt::to_hex;
use crate::rpc::DeclareDeployResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionHashes {
	pub declare: String,
	pub deploy: String,
}

/// Summary of one successful deployment, written once per run.
///
/// The only constructor takes a [`DeclareDeployResult`], so a record can
/// not exist for a run whose submission failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
	pub network: Network,
	pub account: String,
	pub contract_name: String,
	pub class_hash: String,
	pub contract_address: String,
	pub tx: TransactionHashes,
	pub constructor_args: Vec<String>,
	pub timestamp: String,
}

impl DeploymentRecord {
	pub fn new(
		network: Network,
		account: Felt,
		contract_name: &str,
		result: &DeclareDeployResult,
		constructor_args: &[Felt],
		timestamp: DateTime<Utc>,
	) -> Self {
		Self {
			network,
			account: to_hex(&account),
			contract_name: contract_name.to_owned(),
			class_hash: to_hex(&result.declare.class_hash),
			contract_address: to_hex(&result.deploy.contract_address),
			tx: TransactionHashes {
				declare: to_hex(&result.declare.transaction_hash),
				deploy: to_hex(&result.deploy.transaction_hash),
			},
			constructor_args: constructor_args.iter().map(to_hex).collect(),
			timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
		}
	}
}

/// Durable storage for deployment records.
pub trait ResultRecorder {
	fn persist(&self, record: &DeploymentRecord) -> Result<(), RecordError>;
}

impl<R: ResultRecorder + ?Sized> ResultRecorder for &R {
	fn persist(&self, record: &DeploymentRecord) -> Result<(), RecordError> {
		(**self).persist(record)
	}
}

/// Writes the record as pretty-printed JSON to a single file.
#[derive(Debug, Clone)]
pub struct JsonFileRecorder {
	path: PathBuf,
}

impl JsonFileRecorder {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}
}

impl ResultRecorder for JsonFileRecorder {
	fn persist(&self, record: &DeploymentRecord) -> Result<(), RecordError> {
		let io_err = |source: std::io::Error| RecordError::Io {
			path: self.path.display().to_string(),
			source,
		};

		let content = serde_json::to_string_pretty(record)?;
		if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
			std::fs::create_dir_all(parent).map_err(io_err)?;
		}
		std::fs::write(&self.path, content).map_err(io_err)
	}
}
