use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::contract::Abi;
use crate::error::DeployError;

/// A parsed Sierra contract class together with its ABI.
#[derive(Debug, Clone)]
pub struct ContractClassDocument {
	pub raw: Value,
	pub abi: Abi,
}

impl ContractClassDocument {
	pub fn from_value(raw: Value) -> Result<Self, DeployError> {
		let abi_json = raw
			.get("abi")
			.ok_or_else(|| DeployError::Artifact("contract class has no `abi` member".into()))?;
		let abi = Abi::from_json(abi_json)
			.map_err(|e| DeployError::Artifact(format!("contract class ABI: {e}")))?;
		Ok(Self { raw, abi })
	}
}

/// The two compiler outputs needed to declare a class: the Sierra class
/// and the CASM it compiles to.  Nothing checks that they belong together.
#[derive(Debug, Clone)]
pub struct ArtifactPair {
	pub class: ContractClassDocument,
	pub compiled: Value,
}

/// Somewhere a run can get its artifacts from.
pub trait ArtifactSource {
	fn load(&self) -> Result<ArtifactPair, DeployError>;
}

/// Artifact locations on disk, following Scarb's
/// `<package>_<Contract>.contract_class.json` naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
	pub contract_class: PathBuf,
	pub compiled_class: PathBuf,
}

impl ArtifactPaths {
	pub fn new(target_dir: &Path, package: &str, contract: &str) -> Self {
		let stem = format!("{package}_{contract}");
		Self {
			contract_class: target_dir.join(format!("{stem}.contract_class.json")),
			compiled_class: target_dir.join(format!("{stem}.compiled_contract_class.json")),
		}
	}
}

impl ArtifactSource for ArtifactPaths {
	fn load(&self) -> Result<ArtifactPair, DeployError> {
		let class = ContractClassDocument::from_value(read_json(&self.contract_class)?)?;
		let compiled = read_json(&self.compiled_class)?;
		Ok(ArtifactPair { class, compiled })
	}
}

fn read_json(path: &Path) -> Result<Value, DeployError> {
	let content = std::fs::read_to_string(path)
		.map_err(|e| DeployError::Artifact(format!("could not read {}: {e}", path.display())))?;
	serde_json::from_str(&content)
		.map_err(|e| DeployError::Artifact(format!("could not parse {}: {e}", path.display())))
}
