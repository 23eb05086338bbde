//! Cross-chain intents on top of per-chain Kernel accounts.
//!
//! An intent is quoted and accepted by a remote intent service, which splits
//! it into input legs (one per source chain) and an output leg on the
//! destination chain. Every participating account needs the intent executor
//! module before the service can act for it; [`installer`] takes care of
//! that, and [`IntentClient`] sends intents and tracks their legs.

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use thiserror::Error;
use wallet_account::AccountError;
use wallet_smart_account::SmartAccountError;
use wallet_types::{
	CabBalance, CabRequest, ExecutionReceipt, IntentQuote, IntentRequest, IntentSubmission,
	OpenReceipt, SignedIntent,
};

/// Re-export implementations
pub mod implementations {
	pub mod rpc;
}

pub mod client;
pub mod installer;

#[cfg(test)]
mod test_support;

pub use client::IntentClient;
pub use installer::{install_intent_modules, install_order, IntentModules, ModuleInstall};

/// Errors that can occur in intent flows.
#[derive(Debug, Error)]
pub enum IntentError {
	/// A client or account the flow needs is missing.
	#[error("Missing prerequisite: {0}")]
	PrerequisiteMissing(String),
	/// Executor installation stopped part-way through the chain sequence.
	#[error("Intent executor installation failed on chain {failed_chain} (installed on {installed_chains:?}): {reason}")]
	PartialInstallation {
		failed_chain: u64,
		installed_chains: Vec<u64>,
		reason: String,
	},
	/// The intent service could not be reached or answered garbage.
	#[error("Intent service error: {0}")]
	Network(String),
	/// The intent service refused the request.
	#[error("Rejected by intent service (code {code}): {message}")]
	Rejected { code: i64, message: String },
	/// No receipt arrived within the polling budget.
	#[error("No intent receipt after {attempts} attempts")]
	Inconclusive { attempts: u32 },
	#[error(transparent)]
	Account(#[from] SmartAccountError),
	#[error(transparent)]
	Signing(#[from] AccountError),
}

impl IntentError {
	/// Whether a remote service refused the request.
	pub fn is_remote_rejection(&self) -> bool {
		match self {
			IntentError::Rejected { .. } => true,
			IntentError::Account(e) => e.is_remote_rejection(),
			_ => false,
		}
	}
}

/// Remote intent service.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IntentInterface: Send + Sync {
	/// Quotes `request` for the account at `sender` (`ui_getIntent`).
	async fn get_intent(
		&self,
		sender: Address,
		request: &IntentRequest,
	) -> Result<IntentQuote, IntentError>;

	/// Submits a signed quote (`ui_sendUserIntent`).
	async fn send_user_intent(
		&self,
		intent: &SignedIntent,
	) -> Result<IntentSubmission, IntentError>;

	/// Open receipt of an input leg, `None` while the leg is not yet opened.
	async fn get_open_receipt(&self, ui_hash: B256) -> Result<Option<OpenReceipt>, IntentError>;

	/// Execution receipt of the output leg, `None` while it is pending.
	async fn get_execution_receipt(
		&self,
		ui_hash: B256,
	) -> Result<Option<ExecutionReceipt>, IntentError>;

	/// Chain-abstracted balance (`ui_getCAB`).
	async fn get_cab(&self, request: &CabRequest) -> Result<CabBalance, IntentError>;
}
