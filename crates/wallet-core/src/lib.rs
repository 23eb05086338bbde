//! Provider selection and context composition.
//!
//! A [`ProviderSelector`] holds the currently selected wallet-credential
//! provider and one [`ProviderContext`] built for it. The context composes
//! the signer adapter, the per-chain Kernel accounts, session keys and the
//! intent client behind one provider-agnostic surface. Switching provider
//! throws the whole context away.

use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use wallet_account::AccountError;
use wallet_config::Config;
use wallet_delivery::{DeliveryError, DeliveryService};
use wallet_intent::implementations::rpc::RpcIntentService;
use wallet_intent::{IntentError, IntentInterface};
use wallet_session::SessionError;
use wallet_smart_account::SmartAccountError;
use wallet_storage::{StorageError, StorageService};

pub mod action;
pub mod context;
pub mod selector;

pub use action::{ActionKind, ActionState, ActionSuccess, ActionTracker};
pub use context::{Credentials, ProviderContext};
pub use selector::{ProviderSelection, ProviderSelector};

/// Errors surfaced by provider contexts.
#[derive(Debug, Error)]
pub enum WalletError {
	/// A dependency of the action is not ready yet.
	#[error("Missing prerequisite: {0}")]
	PrerequisiteMissing(String),
	/// The selected provider cannot perform the action.
	#[error("Unsupported: {0}")]
	Unsupported(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
	#[error(transparent)]
	Account(#[from] AccountError),
	#[error(transparent)]
	SmartAccount(#[from] SmartAccountError),
	#[error(transparent)]
	Session(#[from] SessionError),
	#[error(transparent)]
	Intent(#[from] IntentError),
	#[error(transparent)]
	Delivery(#[from] DeliveryError),
	#[error(transparent)]
	Storage(#[from] StorageError),
}

/// Category reported with every failed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
	PrerequisiteMissing,
	RemoteRejection,
	PolicyViolation,
	Unsupported,
	Inconclusive,
	Deserialization,
	Internal,
}

impl WalletError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			WalletError::PrerequisiteMissing(_) => ErrorKind::PrerequisiteMissing,
			WalletError::Unsupported(_) => ErrorKind::Unsupported,
			WalletError::Configuration(_) => ErrorKind::Internal,
			WalletError::Account(e) => account_kind(e),
			WalletError::SmartAccount(e) => smart_account_kind(e),
			WalletError::Session(e) => match e {
				SessionError::Deserialization(_) => ErrorKind::Deserialization,
				SessionError::PolicyViolation(_) => ErrorKind::PolicyViolation,
				SessionError::Account(e) => smart_account_kind(e),
				SessionError::Signing(e) => account_kind(e),
				SessionError::Storage(e) => storage_kind(e),
				SessionError::Serialization(_) => ErrorKind::Internal,
			},
			WalletError::Intent(e) => match e {
				IntentError::PrerequisiteMissing(_) => ErrorKind::PrerequisiteMissing,
				IntentError::Inconclusive { .. } => ErrorKind::Inconclusive,
				IntentError::Rejected { .. } | IntentError::PartialInstallation { .. } => {
					ErrorKind::RemoteRejection
				},
				IntentError::Account(e) => smart_account_kind(e),
				IntentError::Signing(e) => account_kind(e),
				IntentError::Network(_) => ErrorKind::Internal,
			},
			WalletError::Delivery(e) => delivery_kind(e),
			WalletError::Storage(e) => storage_kind(e),
		}
	}
}

fn storage_kind(error: &StorageError) -> ErrorKind {
	match error {
		StorageError::Corrupt { .. } => ErrorKind::Deserialization,
		_ => ErrorKind::Internal,
	}
}

fn account_kind(error: &AccountError) -> ErrorKind {
	match error {
		AccountError::NoSession(_) => ErrorKind::PrerequisiteMissing,
		AccountError::UnsupportedConnector(_) | AccountError::UnsupportedOperation(_) => {
			ErrorKind::Unsupported
		},
		AccountError::SigningFailed(_) | AccountError::Remote(_) => ErrorKind::RemoteRejection,
		AccountError::InvalidKey(_) => ErrorKind::Internal,
	}
}

fn smart_account_kind(error: &SmartAccountError) -> ErrorKind {
	match error {
		SmartAccountError::PrerequisiteMissing(_) => ErrorKind::PrerequisiteMissing,
		SmartAccountError::RemoteRejection(_) => ErrorKind::RemoteRejection,
		SmartAccountError::Inconclusive { .. } => ErrorKind::Inconclusive,
		SmartAccountError::Signing(e) => account_kind(e),
		SmartAccountError::Delivery(e) => delivery_kind(e),
		SmartAccountError::Encoding(_) => ErrorKind::Internal,
	}
}

fn delivery_kind(error: &DeliveryError) -> ErrorKind {
	match error {
		DeliveryError::Rejected { .. } => ErrorKind::RemoteRejection,
		DeliveryError::Inconclusive { .. } => ErrorKind::Inconclusive,
		DeliveryError::Network(_) | DeliveryError::Configuration(_) => ErrorKind::Internal,
	}
}

/// Long-lived services shared by every provider context.
#[derive(Clone)]
pub struct WalletServices {
	pub config: Arc<Config>,
	pub storage: Arc<StorageService>,
	pub delivery: Arc<DeliveryService>,
	/// Present when an intent service is configured.
	pub intents: Option<Arc<dyn IntentInterface>>,
}

impl WalletServices {
	/// Builds storage, chain clients and the intent service from `config`.
	pub fn from_config(config: Config) -> Result<Self, WalletError> {
		let primary = &config.storage.primary;
		let table = config.storage.implementations.get(primary).ok_or_else(|| {
			WalletError::Configuration(format!("No configuration for storage '{}'", primary))
		})?;
		let storage = StorageService::from_config(primary, table)?;
		let delivery = DeliveryService::from_networks(&config.networks)?;
		let intents = config.intent.as_ref().map(|intent| {
			Arc::new(RpcIntentService::new(intent.service_url.clone())) as Arc<dyn IntentInterface>
		});

		Ok(Self {
			config: Arc::new(config),
			storage: Arc::new(storage),
			delivery: Arc::new(delivery),
			intents,
		})
	}
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_error_kinds() {
		let cases = [
			(
				WalletError::SmartAccount(SmartAccountError::PrerequisiteMissing("signer".into())),
				ErrorKind::PrerequisiteMissing,
			),
			(
				WalletError::Account(AccountError::UnsupportedConnector("metamask".into())),
				ErrorKind::Unsupported,
			),
			(
				WalletError::SmartAccount(SmartAccountError::Delivery(DeliveryError::Rejected {
					code: -32500,
					message: "sponsorship denied".into(),
				})),
				ErrorKind::RemoteRejection,
			),
			(
				WalletError::Session(SessionError::PolicyViolation("amount too high".into())),
				ErrorKind::PolicyViolation,
			),
			(
				WalletError::Session(SessionError::Deserialization("bad token".into())),
				ErrorKind::Deserialization,
			),
			(
				WalletError::Storage(StorageError::Corrupt {
					key: "local_account:private_key".into(),
					message: "expected value".into(),
				}),
				ErrorKind::Deserialization,
			),
			(
				WalletError::Intent(IntentError::Inconclusive { attempts: 3 }),
				ErrorKind::Inconclusive,
			),
			(
				WalletError::Intent(IntentError::PartialInstallation {
					failed_chain: 84532,
					installed_chains: vec![11155111],
					reason: "reverted".into(),
				}),
				ErrorKind::RemoteRejection,
			),
			(
				WalletError::Account(AccountError::NoSession("logged out".into())),
				ErrorKind::PrerequisiteMissing,
			),
		];
		for (error, kind) in cases {
			assert_eq!(error.kind(), kind, "{}", error);
		}
	}

	#[test]
	fn test_from_config_builds_services() {
		let config: Config = test_support::CONFIG.parse().unwrap();
		let services = WalletServices::from_config(config).unwrap();
		assert_eq!(services.delivery.chain_ids(), vec![84532]);
		assert!(services.intents.is_none());
	}
}
