//! Kernel smart accounts on EIP-7702 upgraded EOAs.
//!
//! The builder turns a credential signer into an [`AccountHandle`] and a
//! [`TransactionClient`] bound to one chain's bundler and paymaster. The
//! handle's address is the signer's EOA; on first use the EOA delegates its
//! code to the Kernel implementation through an EIP-7702 authorization that
//! travels with the first user operation.

use alloy_primitives::Address;
use thiserror::Error;
use wallet_account::AccountError;
use wallet_config::ContractsConfig;
use wallet_delivery::DeliveryError;

pub mod account;
pub mod builder;
pub mod client;
pub mod kernel;

pub use account::{AccountHandle, AccountParts, PermissionValidation, ValidatorBinding};
pub use builder::SmartAccountBuilder;
pub use client::TransactionClient;

/// Errors that can occur while building or driving a smart account.
#[derive(Debug, Error)]
pub enum SmartAccountError {
	/// A dependency the operation needs was not provided.
	#[error("Missing prerequisite: {0}")]
	PrerequisiteMissing(String),
	/// The signer refused or failed.
	#[error(transparent)]
	Signing(#[from] AccountError),
	/// A remote service failed or refused.
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
	/// On-chain data could not be encoded or decoded.
	#[error("Encoding error: {0}")]
	Encoding(String),
	/// The operation was included but reverted.
	#[error("Remote rejection: {0}")]
	RemoteRejection(String),
	/// No receipt arrived within the polling budget.
	#[error("No receipt after {attempts} attempts")]
	Inconclusive { attempts: u32 },
}

impl SmartAccountError {
	/// Whether a remote service refused the request or the operation reverted.
	pub fn is_remote_rejection(&self) -> bool {
		matches!(
			self,
			SmartAccountError::RemoteRejection(_)
				| SmartAccountError::Delivery(DeliveryError::Rejected { .. })
		)
	}

	/// Whether a remote refusal mentions `needle` (case-insensitive).
	pub fn is_rejection_containing(&self, needle: &str) -> bool {
		match self {
			SmartAccountError::Delivery(e) => e.is_rejection_containing(needle),
			SmartAccountError::RemoteRejection(message) => {
				message.to_lowercase().contains(&needle.to_lowercase())
			},
			_ => false,
		}
	}
}

/// Addresses of the contracts a Kernel account depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelContracts {
	pub entry_point: Address,
	pub kernel_implementation: Address,
	pub ecdsa_validator: Address,
}

impl From<&ContractsConfig> for KernelContracts {
	fn from(config: &ContractsConfig) -> Self {
		Self {
			entry_point: config.entry_point,
			kernel_implementation: config.kernel_implementation,
			ecdsa_validator: config.ecdsa_validator,
		}
	}
}
