use std::path::PathBuf;

use anyhow::Result;

use crate::artifacts::ArtifactPaths;
use crate::cli::{Cli, DeployArgs};
use crate::commands::{load_config, resolve_endpoint};
use crate::config::{Settings, ENV_PRIVATE_KEY};
use crate::felt::to_hex;
use crate::orchestrator::{DeploymentPlan, Orchestrator, Recording, SmokeTest, Verification};
use crate::record::JsonFileRecorder;
use crate::rpc::StarknetConnector;

/// Full deployment pipeline: connect -> authenticate -> load artifacts ->
/// declare+deploy -> smoke test -> write record.
pub async fn run(cli: &Cli, args: &DeployArgs) -> Result<()> {
	let config = load_config()?;
	let endpoint = resolve_endpoint(cli, &config);
	let address = cli.address.clone().or(config.signer.address.clone());
	let settings = Settings::new(endpoint, address, std::env::var(ENV_PRIVATE_KEY).ok())?;

	let plan = plan_from_args(args);
	let output = args
		.output
		.clone()
		.unwrap_or_else(|| default_output(&args.package));
	let recorder = JsonFileRecorder::new(output);

	let orchestrator = Orchestrator::new(settings, StarknetConnector, &recorder);
	let outcome = orchestrator.run(&plan).await?;

	println!("Contract declared with class hash: {}", to_hex(&outcome.result.declare.class_hash));
	println!("Contract deployed at address:      {}", to_hex(&outcome.result.deploy.contract_address));
	println!("  Declare tx: {}", to_hex(&outcome.result.declare.transaction_hash));
	println!("  Deploy tx:  {}", to_hex(&outcome.result.deploy.transaction_hash));

	match &outcome.verification {
		Verification::Passed { initial, current } => {
			println!("Smoke test passed: {} went from {initial} to {current}.", args.getter);
		}
		Verification::Failed(reason) => println!("Smoke test failed: {reason}"),
		Verification::Skipped => println!("Smoke test skipped."),
	}

	match &outcome.recording {
		Recording::Recorded => println!("Saved deployment summary to {}", recorder.path().display()),
		Recording::Failed(reason) => println!("Could not write deployment summary: {reason}"),
	}

	Ok(())
}

fn plan_from_args(args: &DeployArgs) -> DeploymentPlan<ArtifactPaths> {
	let mut artifacts = ArtifactPaths::new(&args.target_dir, &args.package, &args.contract);
	if let Some(path) = &args.contract_class {
		artifacts.contract_class = path.clone();
	}
	if let Some(path) = &args.compiled_class {
		artifacts.compiled_class = path.clone();
	}

	let smoke_test = (!args.no_smoke_test).then(|| SmokeTest {
		getter: args.getter.clone(),
		setter: args.setter.clone(),
		amount: args.amount,
		expected: args.expected,
	});

	DeploymentPlan {
		contract_name: args.contract.clone(),
		artifacts,
		constructor_args: args.constructor_args.clone(),
		smoke_test,
	}
}

fn default_output(package: &str) -> PathBuf {
	PathBuf::from(format!("{package}_deployment.json"))
}
