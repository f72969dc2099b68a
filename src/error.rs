use starknet::core::types::Felt;
use thiserror::Error;

/// Errors that abort a deployment run.  Everything here happens at or
/// before the declare-and-deploy submission and maps to a non-zero exit.
#[derive(Debug, Error)]
pub enum DeployError {
	#[error("configuration error: {0}")]
	Config(String),

	#[error("artifact error: {0}")]
	Artifact(String),

	#[error("declare-and-deploy failed: {0}")]
	Submission(#[source] ClientError),
}

/// Failures reported by a network client or a contract handle.
#[derive(Debug, Error)]
pub enum ClientError {
	#[error("invalid RPC endpoint: {0}")]
	Endpoint(String),

	#[error("RPC error: {0}")]
	Rpc(String),

	#[error("transaction rejected: {0}")]
	Rejected(String),

	#[error("transaction {hash:#x} reverted: {reason}")]
	Reverted { hash: Felt, reason: String },

	#[error("invalid contract class: {0}")]
	Class(String),

	#[error("entry point `{0}` is not declared in the ABI")]
	UnknownEntryPoint(String),

	#[error("entry point `{name}` is {actual}, expected {expected}")]
	Mutability {
		name: String,
		expected: &'static str,
		actual: &'static str,
	},
}

/// Post-deployment smoke test failures.  Never fatal.
#[derive(Debug, Error)]
pub enum VerifyError {
	#[error(transparent)]
	Client(#[from] ClientError),

	#[error("`{0}` returned no value")]
	EmptyResponse(String),

	#[error("expected {expected} after write, read {actual}")]
	Mismatch { expected: Felt, actual: Felt },
}

/// Deployment record persistence failures.  Never fatal.
#[derive(Debug, Error)]
pub enum RecordError {
	#[error("could not serialize deployment record: {0}")]
	Serialize(#[from] serde_json::Error),

	#[error("could not write {path}: {source}")]
	Io {
		path: String,
		#[source]
		source: std::io::Error,
	},
}
