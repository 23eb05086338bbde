//! Session keys with scoped permissions.
//!
//! A session key is an ephemeral local key that may act for a root Kernel
//! account, restricted by a [`CallPolicy`] the remote permission validator
//! enforces. Keys are derived once per provider and wallet address, stored
//! as an opaque token and restored on later use.

use alloy_primitives::Address;
use thiserror::Error;
use wallet_account::AccountError;
use wallet_config::SessionConfig;
use wallet_smart_account::SmartAccountError;
use wallet_storage::StorageError;

pub mod manager;
pub mod policy;
pub mod session;

pub use manager::SessionKeyManager;
pub use policy::{erc20_transfer, ArgumentPredicate, CallPolicy, ParamCondition, PermissionRule};
pub use session::{Derived, PolicyBound, SerializedSessionKey, SessionAccount, SessionKey};

/// Errors that can occur in session-key flows.
#[derive(Debug, Error)]
pub enum SessionError {
	/// A stored token is corrupt or belongs to another account.
	#[error("Deserialization error: {0}")]
	Deserialization(String),
	/// The token could not be produced.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// The bundler or the permission validator refused a session operation.
	#[error("Policy violation: {0}")]
	PolicyViolation(String),
	#[error(transparent)]
	Account(#[from] SmartAccountError),
	#[error(transparent)]
	Signing(#[from] AccountError),
	#[error(transparent)]
	Storage(#[from] StorageError),
}

impl SessionError {
	/// Classifies a failure of an operation sent through a session client.
	pub(crate) fn from_client(error: SmartAccountError) -> Self {
		if error.is_remote_rejection() {
			SessionError::PolicyViolation(error.to_string())
		} else {
			SessionError::Account(error)
		}
	}
}

/// On-chain modules backing a permission validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionModules {
	/// Call-policy module (v0.0.4).
	pub call_policy: Address,
	/// ECDSA signer module bound to the session key.
	pub ecdsa_signer: Address,
}

impl From<&SessionConfig> for SessionModules {
	fn from(config: &SessionConfig) -> Self {
		Self {
			call_policy: config.call_policy,
			ecdsa_signer: config.ecdsa_signer,
		}
	}
}
