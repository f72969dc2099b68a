pub mod artifacts;
pub mod cli;
pub mod commands;
pub mod config;
pub mod contract;
pub mod error;
pub mod felt;
pub mod orchestrator;
pub mod record;
pub mod rpc;
pub mod signer;
