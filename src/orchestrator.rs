use std::fmt;

use chrono::Utc;
use starknet::core::types::Felt;
use tracing::{debug, error, info, warn};

use crate::artifacts::ArtifactSource;
use crate::config::Settings;
use crate::contract::ContractHandle;
use crate::error::{DeployError, VerifyError};
use crate::felt::to_hex;
use crate::record::{DeploymentRecord, ResultRecorder};
use crate::rpc::{Connector, DeclareDeployResult, NetworkClient};
use crate::signer::SigningIdentity;

/// States a run moves through.  Only the transitions up to and including
/// `Deployed` can fail the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Init,
	Connected,
	Authenticated,
	ArtifactsLoaded,
	Deployed,
	Verified,
	VerificationSkipped,
	Recorded,
	RecordingSkipped,
	Done,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Init => "init",
			Self::Connected => "connected",
			Self::Authenticated => "authenticated",
			Self::ArtifactsLoaded => "artifacts-loaded",
			Self::Deployed => "declared+deployed",
			Self::Verified => "verified",
			Self::VerificationSkipped => "verification-skipped",
			Self::Recorded => "recorded",
			Self::RecordingSkipped => "recording-skipped",
			Self::Done => "done",
		};
		f.write_str(s)
	}
}

/// A post-deployment functional check: read `getter`, call
/// `setter(amount)`, and expect the getter to then return `expected`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeTest {
	pub getter: String,
	pub setter: String,
	pub amount: Felt,
	pub expected: Felt,
}

impl Default for SmokeTest {
	fn default() -> Self {
		Self {
			getter: "get_balance".into(),
			setter: "increase_balance".into(),
			amount: Felt::from(100u64),
			expected: Felt::from(100u64),
		}
	}
}

/// What to deploy.
#[derive(Debug, Clone)]
pub struct DeploymentPlan<S> {
	pub contract_name: String,
	pub artifacts: S,
	pub constructor_args: Vec<Felt>,
	pub smoke_test: Option<SmokeTest>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
	Passed { initial: Felt, current: Felt },
	Failed(String),
	Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recording {
	Recorded,
	Failed(String),
}

/// Result of a run that got past declare-and-deploy.
#[derive(Debug, Clone)]
pub struct Outcome {
	pub result: DeclareDeployResult,
	pub record: DeploymentRecord,
	pub verification: Verification,
	pub recording: Recording,
}

/// Drives connect, authenticate, load, declare+deploy, verify, record.
pub struct Orchestrator<K, R> {
	settings: Settings,
	connector: K,
	recorder: R,
}

impl<K, R> Orchestrator<K, R>
where
	K: Connector,
	R: ResultRecorder,
{
	pub fn new(settings: Settings, connector: K, recorder: R) -> Self {
		Self {
			settings,
			connector,
			recorder,
		}
	}

	/// Run every stage in order.  Returns `Err` only when the run failed
	/// at or before declare-and-deploy; verification and recording
	/// failures are logged and reported in the [`Outcome`].
	pub async fn run<S: ArtifactSource>(
		&self,
		plan: &DeploymentPlan<S>,
	) -> Result<Outcome, DeployError> {
		enter(Stage::Init);
		let endpoint = &self.settings.endpoint;

		info!(network = %endpoint.network, url = %endpoint.rpc_url, "connecting");
		let client = self
			.connector
			.connect(endpoint)
			.await
			.map_err(|e| DeployError::Config(e.to_string()))?;
		enter(Stage::Connected);

		let identity = SigningIdentity::new(
			&self.settings.signer_address,
			&self.settings.private_key,
			endpoint.clone(),
		)?;
		info!(
			account = %to_hex(&identity.address()),
			network = %identity.endpoint().network,
			"connected to account"
		);
		enter(Stage::Authenticated);

		let artifacts = plan.artifacts.load()?;
		let args: Vec<String> = plan.constructor_args.iter().map(to_hex).collect();
		info!(contract = %plan.contract_name, constructor_args = ?args, "artifacts loaded");
		enter(Stage::ArtifactsLoaded);

		info!("declaring and deploying {}", plan.contract_name);
		let result = match client
			.declare_and_deploy(&identity, &artifacts, &plan.constructor_args)
			.await
		{
			Ok(result) => result,
			Err(e) => {
				error!(error = %e, "deployment failed");
				return Err(DeployError::Submission(e));
			}
		};
		info!(class_hash = %to_hex(&result.declare.class_hash), "contract declared");
		info!(address = %to_hex(&result.deploy.contract_address), "contract deployed");
		enter(Stage::Deployed);

		let handle = ContractHandle::new(
			artifacts.class.abi.clone(),
			result.deploy.contract_address,
			&client,
			&identity,
		);
		debug!(
			address = %to_hex(&handle.address()),
			entry_points = handle.abi().entry_points().count(),
			"bound contract handle"
		);
		let verification = match &plan.smoke_test {
			Some(test) => match smoke_test(&handle, &client, test).await {
				Ok((initial, current)) => {
					info!(%initial, %current, "contract functionality working");
					Verification::Passed { initial, current }
				}
				Err(e) => {
					warn!(error = %e, "could not verify contract functionality");
					Verification::Failed(e.to_string())
				}
			},
			None => Verification::Skipped,
		};
		enter(match verification {
			Verification::Passed { .. } => Stage::Verified,
			_ => Stage::VerificationSkipped,
		});

		let record = DeploymentRecord::new(
			endpoint.network,
			identity.address(),
			&plan.contract_name,
			&result,
			&plan.constructor_args,
			Utc::now(),
		);
		let recording = match self.recorder.persist(&record) {
			Ok(()) => {
				enter(Stage::Recorded);
				Recording::Recorded
			}
			Err(e) => {
				warn!(error = %e, "could not save deployment record");
				enter(Stage::RecordingSkipped);
				Recording::Failed(e.to_string())
			}
		};

		enter(Stage::Done);
		Ok(Outcome {
			result,
			record,
			verification,
			recording,
		})
	}
}

fn enter(stage: Stage) {
	debug!(%stage, "stage");
}

/// Returns the value read before and after the write.
async fn smoke_test<C: NetworkClient>(
	handle: &ContractHandle<'_, C>,
	client: &C,
	test: &SmokeTest,
) -> Result<(Felt, Felt), VerifyError> {
	let initial = read_value(handle, &test.getter).await?;
	info!(%initial, "initial {}", test.getter);

	info!("calling {}({})", test.setter, test.amount);
	let tx = handle.invoke(&test.setter, &[test.amount]).await?;
	client.wait_for_transaction(tx).await?;

	let current = read_value(handle, &test.getter).await?;
	info!(%current, "new {}", test.getter);

	if current != test.expected {
		return Err(VerifyError::Mismatch {
			expected: test.expected,
			actual: current,
		});
	}
	Ok((initial, current))
}

async fn read_value<C: NetworkClient>(
	handle: &ContractHandle<'_, C>,
	getter: &str,
) -> Result<Felt, VerifyError> {
	handle
		.call(getter, &[])
		.await?
		.first()
		.copied()
		.ok_or_else(|| VerifyError::EmptyResponse(getter.to_owned()))
}

#[cfg(test)]
mod tests {
	use std::collections::VecDeque;
	use std::sync::{Arc, Mutex};

	use async_trait::async_trait;

	use super::*;
	use crate::artifacts::{ArtifactPair, ContractClassDocument};
	use crate::config::{Network, NetworkEndpoint};
	use crate::error::{ClientError, RecordError};
	use crate::rpc::{DeclareResult, DeployResult, ReadResult, StarknetConnector, WriteResult};

	const CLASS_HASH: u64 = 0xc1a55;
	const CONTRACT_ADDRESS: u64 = 0xc0ffee;
	const WRITE_TX: u64 = 0x3;

	/// Everything the mock network saw during a run.
	#[derive(Default)]
	struct Ledger {
		submissions: Vec<Vec<Felt>>,
		reads: usize,
		writes: Vec<(String, Vec<Felt>)>,
		waits: Vec<Felt>,
	}

	#[derive(Clone, Default)]
	struct Behaviour {
		reject_submission: bool,
		reads: VecDeque<Felt>,
		reject_write: bool,
	}

	struct MockClient {
		ledger: Arc<Mutex<Ledger>>,
		behaviour: Mutex<Behaviour>,
	}

	#[async_trait]
	impl NetworkClient for MockClient {
		async fn declare_and_deploy(
			&self,
			_signer: &SigningIdentity,
			_artifacts: &ArtifactPair,
			constructor_args: &[Felt],
		) -> Result<DeclareDeployResult, ClientError> {
			self.ledger
				.lock()
				.unwrap()
				.submissions
				.push(constructor_args.to_vec());
			if self.behaviour.lock().unwrap().reject_submission {
				return Err(ClientError::Rejected("insufficient funds".into()));
			}
			Ok(expected_result())
		}

		async fn call_read(&self, _address: Felt, _entry_point: &str, _args: &[Felt]) -> ReadResult {
			self.ledger.lock().unwrap().reads += 1;
			self.behaviour
				.lock()
				.unwrap()
				.reads
				.pop_front()
				.map(|v| vec![v])
				.ok_or_else(|| ClientError::Rpc("node unavailable".into()))
		}

		async fn call_write(
			&self,
			_signer: &SigningIdentity,
			_address: Felt,
			entry_point: &str,
			args: &[Felt],
		) -> WriteResult {
			if self.behaviour.lock().unwrap().reject_write {
				return Err(ClientError::Rejected("nonce too low".into()));
			}
			self.ledger
				.lock()
				.unwrap()
				.writes
				.push((entry_point.to_owned(), args.to_vec()));
			Ok(Felt::from(WRITE_TX))
		}

		async fn wait_for_transaction(&self, tx_hash: Felt) -> Result<(), ClientError> {
			self.ledger.lock().unwrap().waits.push(tx_hash);
			Ok(())
		}
	}

	struct MockConnector {
		ledger: Arc<Mutex<Ledger>>,
		behaviour: Behaviour,
	}

	#[async_trait]
	impl Connector for MockConnector {
		type Client = MockClient;

		async fn connect(&self, _endpoint: &NetworkEndpoint) -> Result<MockClient, ClientError> {
			Ok(MockClient {
				ledger: self.ledger.clone(),
				behaviour: Mutex::new(self.behaviour.clone()),
			})
		}
	}

	struct StaticArtifacts;

	impl ArtifactSource for StaticArtifacts {
		fn load(&self) -> Result<ArtifactPair, DeployError> {
			let class = ContractClassDocument::from_value(serde_json::json!({
				"sierra_program": [],
				"abi": [{
					"type": "interface",
					"name": "example::IHelloStarknet",
					"items": [
						{
							"type": "function",
							"name": "increase_balance",
							"inputs": [{ "name": "amount", "type": "core::felt252" }],
							"outputs": [],
							"state_mutability": "external"
						},
						{
							"type": "function",
							"name": "get_balance",
							"inputs": [],
							"outputs": [{ "type": "core::felt252" }],
							"state_mutability": "view"
						}
					]
				}]
			}))?;
			Ok(ArtifactPair {
				class,
				compiled: serde_json::json!({ "bytecode": [] }),
			})
		}
	}

	struct MissingArtifacts;

	impl ArtifactSource for MissingArtifacts {
		fn load(&self) -> Result<ArtifactPair, DeployError> {
			Err(DeployError::Artifact("could not read example.json".into()))
		}
	}

	#[derive(Default)]
	struct MockRecorder {
		fail: bool,
		records: Mutex<Vec<DeploymentRecord>>,
	}

	impl ResultRecorder for MockRecorder {
		fn persist(&self, record: &DeploymentRecord) -> Result<(), RecordError> {
			if self.fail {
				return Err(RecordError::Io {
					path: "example_deployment.json".into(),
					source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
				});
			}
			self.records.lock().unwrap().push(record.clone());
			Ok(())
		}
	}

	fn expected_result() -> DeclareDeployResult {
		DeclareDeployResult {
			declare: DeclareResult {
				class_hash: Felt::from(CLASS_HASH),
				transaction_hash: Felt::from(0x1u64),
			},
			deploy: DeployResult {
				contract_address: Felt::from(CONTRACT_ADDRESS),
				transaction_hash: Felt::from(0x2u64),
			},
		}
	}

	fn settings(rpc_url: &str) -> Settings {
		Settings::new(
			NetworkEndpoint {
				network: Network::Sepolia,
				rpc_url: rpc_url.into(),
			},
			Some("0xabc".into()),
			Some("0x1234".into()),
		)
		.unwrap()
	}

	fn plan<S>(artifacts: S, args: Vec<Felt>, smoke_test: Option<SmokeTest>) -> DeploymentPlan<S> {
		DeploymentPlan {
			contract_name: "Example".into(),
			artifacts,
			constructor_args: args,
			smoke_test,
		}
	}

	fn connector(behaviour: Behaviour) -> (MockConnector, Arc<Mutex<Ledger>>) {
		let ledger = Arc::new(Mutex::new(Ledger::default()));
		(
			MockConnector {
				ledger: ledger.clone(),
				behaviour,
			},
			ledger,
		)
	}

	fn reads(values: &[u64]) -> Behaviour {
		Behaviour {
			reads: values.iter().copied().map(Felt::from).collect(),
			..Behaviour::default()
		}
	}

	#[tokio::test]
	async fn record_holds_submission_result_verbatim() {
		let (connector, ledger) = connector(Behaviour::default());
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);

		let outcome = orchestrator
			.run(&plan(StaticArtifacts, vec![], None))
			.await
			.unwrap();

		assert_eq!(outcome.result, expected_result());
		assert_eq!(outcome.verification, Verification::Skipped);
		assert_eq!(outcome.recording, Recording::Recorded);
		assert_eq!(ledger.lock().unwrap().submissions, vec![Vec::<Felt>::new()]);

		let records = recorder.records.lock().unwrap();
		assert_eq!(records.len(), 1);
		assert_eq!(records[0].network, Network::Sepolia);
		assert_eq!(records[0].account, "0xabc");
		assert_eq!(records[0].contract_name, "Example");
		assert_eq!(records[0].class_hash, "0xc1a55");
		assert_eq!(records[0].contract_address, "0xc0ffee");
		assert_eq!(records[0].tx.declare, "0x1");
		assert_eq!(records[0].tx.deploy, "0x2");
		assert!(records[0].constructor_args.is_empty());
	}

	#[tokio::test]
	async fn constructor_args_reach_submission_unmodified() {
		let (connector, ledger) = connector(Behaviour::default());
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);
		let args = vec![Felt::from(1u64), Felt::from_hex("0x2a").unwrap(), Felt::ZERO];

		orchestrator
			.run(&plan(StaticArtifacts, args.clone(), None))
			.await
			.unwrap();

		assert_eq!(ledger.lock().unwrap().submissions, vec![args]);
		assert_eq!(
			recorder.records.lock().unwrap()[0].constructor_args,
			["0x1", "0x2a", "0x0"]
		);
	}

	#[tokio::test]
	async fn failed_submission_produces_no_record() {
		let (connector, ledger) = connector(Behaviour {
			reject_submission: true,
			..reads(&[0, 100])
		});
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);

		let err = orchestrator
			.run(&plan(StaticArtifacts, vec![], Some(SmokeTest::default())))
			.await
			.unwrap_err();

		assert!(matches!(err, DeployError::Submission(ClientError::Rejected(_))));
		assert!(recorder.records.lock().unwrap().is_empty());
		let ledger = ledger.lock().unwrap();
		assert_eq!(ledger.submissions.len(), 1);
		assert_eq!(ledger.reads, 0);
		assert!(ledger.writes.is_empty());
	}

	#[tokio::test]
	async fn smoke_test_passes_when_value_reaches_expected() {
		let (connector, ledger) = connector(reads(&[0, 100]));
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);

		let outcome = orchestrator
			.run(&plan(StaticArtifacts, vec![], Some(SmokeTest::default())))
			.await
			.unwrap();

		assert_eq!(
			outcome.verification,
			Verification::Passed {
				initial: Felt::ZERO,
				current: Felt::from(100u64)
			}
		);
		let ledger = ledger.lock().unwrap();
		assert_eq!(
			ledger.writes,
			vec![("increase_balance".to_owned(), vec![Felt::from(100u64)])]
		);
		// The write is awaited before the second read.
		assert_eq!(ledger.waits, vec![Felt::from(WRITE_TX)]);
		assert_eq!(ledger.reads, 2);
	}

	#[tokio::test]
	async fn smoke_test_mismatch_does_not_fail_the_run() {
		let (connector, _ledger) = connector(reads(&[0, 99]));
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);

		let outcome = orchestrator
			.run(&plan(StaticArtifacts, vec![], Some(SmokeTest::default())))
			.await
			.unwrap();

		assert!(matches!(outcome.verification, Verification::Failed(msg) if msg.contains("expected 100")));
		assert_eq!(outcome.result, expected_result());
		assert_eq!(outcome.recording, Recording::Recorded);
		assert_eq!(recorder.records.lock().unwrap().len(), 1);
	}

	#[tokio::test]
	async fn smoke_test_network_errors_are_contained() {
		let (connector, _ledger) = connector(Behaviour {
			reject_write: true,
			..reads(&[0])
		});
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);

		let outcome = orchestrator
			.run(&plan(StaticArtifacts, vec![], Some(SmokeTest::default())))
			.await
			.unwrap();

		assert!(matches!(outcome.verification, Verification::Failed(msg) if msg.contains("nonce")));
		assert_eq!(outcome.recording, Recording::Recorded);
	}

	#[tokio::test]
	async fn smoke_test_rejects_entry_points_missing_from_abi() {
		let (connector, ledger) = connector(reads(&[0, 100]));
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);
		let test = SmokeTest {
			getter: "get_counter".into(),
			..SmokeTest::default()
		};

		let outcome = orchestrator
			.run(&plan(StaticArtifacts, vec![], Some(test)))
			.await
			.unwrap();

		assert!(matches!(outcome.verification, Verification::Failed(msg) if msg.contains("get_counter")));
		assert_eq!(ledger.lock().unwrap().reads, 0);
	}

	#[tokio::test]
	async fn empty_rpc_url_stops_before_submission() {
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings(""), StarknetConnector, &recorder);

		// Loading artifacts would fail too; the run must stop before that.
		let err = orchestrator
			.run(&plan(MissingArtifacts, vec![], Some(SmokeTest::default())))
			.await
			.unwrap_err();

		assert!(matches!(err, DeployError::Config(msg) if msg.contains("empty")));
		assert!(recorder.records.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn smoke_test_fails_when_value_is_not_the_expected_one() {
		let (connector, ledger) = connector(reads(&[5, 105]));
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);

		let outcome = orchestrator
			.run(&plan(StaticArtifacts, vec![], Some(SmokeTest::default())))
			.await
			.unwrap();

		assert!(matches!(
			outcome.verification,
			Verification::Failed(msg) if msg.contains("expected 100") && msg.contains("read 105")
		));
		assert_eq!(ledger.lock().unwrap().reads, 2);
		assert_eq!(outcome.recording, Recording::Recorded);
	}

	#[tokio::test]
	async fn malformed_signer_stops_before_submission() {
		let (connector, ledger) = connector(Behaviour::default());
		let recorder = MockRecorder::default();
		let mut settings = settings("http://node");
		settings.signer_address = "not-an-address".into();
		let orchestrator = Orchestrator::new(settings, connector, &recorder);

		let err = orchestrator
			.run(&plan(StaticArtifacts, vec![], None))
			.await
			.unwrap_err();

		assert!(matches!(err, DeployError::Config(_)));
		assert!(ledger.lock().unwrap().submissions.is_empty());
	}

	#[tokio::test]
	async fn missing_artifacts_stop_before_submission() {
		let (connector, ledger) = connector(Behaviour::default());
		let recorder = MockRecorder::default();
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);

		let err = orchestrator
			.run(&plan(MissingArtifacts, vec![], None))
			.await
			.unwrap_err();

		assert!(matches!(err, DeployError::Artifact(_)));
		assert!(ledger.lock().unwrap().submissions.is_empty());
		assert!(recorder.records.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn recorder_failure_is_only_a_warning() {
		let (connector, _ledger) = connector(reads(&[0, 100]));
		let recorder = MockRecorder {
			fail: true,
			..MockRecorder::default()
		};
		let orchestrator = Orchestrator::new(settings("http://node"), connector, &recorder);

		let outcome = orchestrator
			.run(&plan(StaticArtifacts, vec![], Some(SmokeTest::default())))
			.await
			.unwrap();

		assert!(matches!(outcome.recording, Recording::Failed(msg) if msg.contains("read-only")));
		assert_eq!(outcome.result, expected_result());
		assert_eq!(outcome.record.class_hash, "0xc1a55");
		assert!(matches!(outcome.verification, Verification::Passed { .. }));
	}
}
