//! Intent module installation across chains.
//!
//! Every chain gets the intent executor and, when configured, the
//! multi-chain ECDSA validator. Installing is idempotent: the account is
//! asked first, and a bundler refusal saying the module is already
//! installed counts as done.
//! Chains are processed strictly one after another so a failure always
//! leaves a well-defined prefix of installed chains.

use crate::IntentError;
use alloy_primitives::{Address, Bytes, B256};
use std::collections::BTreeMap;
use tracing::instrument;
use wallet_smart_account::kernel::{ValidationType, MODULE_TYPE_EXECUTOR};
use wallet_smart_account::{SmartAccountError, TransactionClient};

/// Modules an intent-capable account needs on every chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentModules {
	pub executor: Address,
	/// Multi-chain ECDSA validator owned by the account itself.
	pub validator: Option<Address>,
}

/// Outcome of installing one module on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleInstall {
	AlreadyInstalled,
	Installed { transaction_hash: B256 },
}

/// Chains in install order: input chains ascending, then the output chain.
///
/// Duplicates are dropped; an output chain listed among the inputs is
/// installed last.
pub fn install_order(input_chains: &[u64], output_chain: u64) -> Vec<u64> {
	let mut order: Vec<u64> = input_chains
		.iter()
		.copied()
		.filter(|chain| *chain != output_chain)
		.collect();
	order.sort_unstable();
	order.dedup();
	order.push(output_chain);
	order
}

/// Installs `executor` on the account behind `client` unless it is already there.
#[instrument(skip_all, fields(chain_id = client.chain_id(), executor = %executor))]
pub async fn ensure_executor(
	client: &TransactionClient,
	executor: Address,
) -> Result<ModuleInstall, SmartAccountError> {
	let account = client.account();
	// Undelegated accounts have no module registry to ask
	if account.is_deployed().await?
		&& account.is_module_installed(MODULE_TYPE_EXECUTOR, executor).await?
	{
		tracing::debug!("Intent executor already installed");
		return Ok(ModuleInstall::AlreadyInstalled);
	}

	let installed = client.install_executor(executor, Bytes::new()).await;
	settle_install(installed, "intent executor")
}

/// Installs `validator` as a plain validation unless its config already has a hook.
///
/// The validator data is the account's own address.
#[instrument(skip_all, fields(chain_id = client.chain_id(), validator = %validator))]
pub async fn ensure_validator(
	client: &TransactionClient,
	validator: Address,
) -> Result<ModuleInstall, SmartAccountError> {
	let account = client.account();
	if account.is_deployed().await?
		&& account
			.is_validation_installed(ValidationType::Validator(validator))
			.await?
	{
		tracing::debug!("Intent validator already installed");
		return Ok(ModuleInstall::AlreadyInstalled);
	}

	let owner = Bytes::copy_from_slice(account.address().as_slice());
	let installed = client
		.install_validator(validator, owner, Bytes::new(), Bytes::new())
		.await;
	settle_install(installed, "intent validator")
}

fn settle_install(
	result: Result<B256, SmartAccountError>,
	module: &str,
) -> Result<ModuleInstall, SmartAccountError> {
	match result {
		Ok(transaction_hash) => {
			tracing::info!(tx_hash = %transaction_hash, "Installed {}", module);
			Ok(ModuleInstall::Installed { transaction_hash })
		},
		Err(e) if e.is_rejection_containing("already installed") => {
			tracing::debug!("Bundler reports {} already installed", module);
			Ok(ModuleInstall::AlreadyInstalled)
		},
		Err(e) => Err(e),
	}
}

/// Installs `modules` on every chain of `order`, one chain at a time.
///
/// Returns the chains processed, in order. The first failure aborts the
/// sequence with [`IntentError::PartialInstallation`].
pub async fn install_intent_modules(
	clients: &BTreeMap<u64, TransactionClient>,
	order: &[u64],
	modules: &IntentModules,
) -> Result<Vec<u64>, IntentError> {
	let mut installed_chains = Vec::with_capacity(order.len());

	for &chain_id in order {
		let partial = |reason: String| IntentError::PartialInstallation {
			failed_chain: chain_id,
			installed_chains: installed_chains.clone(),
			reason,
		};

		let client = clients
			.get(&chain_id)
			.ok_or_else(|| partial(format!("no account client for chain {}", chain_id)))?;
		if let Err(e) = ensure_executor(client, modules.executor).await {
			tracing::warn!(chain_id, error = %e, "Intent executor installation failed");
			return Err(partial(e.to_string()));
		}
		if let Some(validator) = modules.validator {
			if let Err(e) = ensure_validator(client, validator).await {
				tracing::warn!(chain_id, error = %e, "Intent validator installation failed");
				return Err(partial(e.to_string()));
			}
		}
		installed_chains.push(chain_id);
	}

	Ok(installed_chains)
}
