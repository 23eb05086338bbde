//! Account handles.
//!
//! An [`AccountHandle`] is the immutable description of one Kernel account
//! on one chain: where it lives, which validation signs for it and which
//! signer backs that validation. Handles are never mutated; anything that
//! changes produces a new handle with a new instance id.

use crate::kernel::{
	self, Enable, ValidationMode, ValidationType, DUMMY_ECDSA_SIGNATURE,
};
use crate::SmartAccountError;
use alloy_primitives::{Address, Bytes, FixedBytes};
use std::sync::Arc;
use uuid::Uuid;
use wallet_account::SignerInterface;
use wallet_delivery::PublicClientInterface;
use wallet_types::AuthorizationGrant;

/// Validation the account's user operations are checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatorBinding {
	/// The ECDSA validator installed as sudo (root) validator.
	Sudo { ecdsa_validator: Address },
	/// A permission validator enabled by the root signer.
	Permission(PermissionValidation),
}

/// Permission validation plus the data needed to enable it on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionValidation {
	pub permission_id: FixedBytes<4>,
	/// Signed `Enable` message; the enable signature is the root signer's.
	pub enable: Enable,
	pub enable_signature: Bytes,
}

impl ValidatorBinding {
	pub fn validation_type(&self) -> ValidationType {
		match self {
			ValidatorBinding::Sudo { .. } => ValidationType::Root,
			ValidatorBinding::Permission(permission) => {
				ValidationType::Permission(permission.permission_id)
			},
		}
	}

	/// Wraps a raw ECDSA signature over the user-operation hash.
	pub fn wrap_signature(&self, mode: ValidationMode, signature: &[u8]) -> Bytes {
		match self {
			ValidatorBinding::Sudo { .. } => Bytes::copy_from_slice(signature),
			ValidatorBinding::Permission(permission) => {
				let inner = kernel::permission_signature(signature);
				match mode {
					ValidationMode::Default => inner,
					ValidationMode::Enable => kernel::enable_mode_signature(
						&permission.enable,
						permission.enable_signature.clone(),
						inner,
					),
				}
			},
		}
	}

	/// Placeholder signature with the final signature's layout.
	pub fn dummy_signature(&self, mode: ValidationMode) -> Bytes {
		self.wrap_signature(mode, &DUMMY_ECDSA_SIGNATURE)
	}
}

/// One Kernel account on one chain.
#[derive(Clone)]
pub struct AccountHandle {
	instance_id: Uuid,
	address: Address,
	chain_id: u64,
	entry_point: Address,
	kernel_implementation: Address,
	validator: ValidatorBinding,
	signer: Arc<dyn SignerInterface>,
	authorization: Option<AuthorizationGrant>,
	public_client: Arc<dyn PublicClientInterface>,
}

impl std::fmt::Debug for AccountHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AccountHandle")
			.field("instance_id", &self.instance_id)
			.field("address", &self.address)
			.field("chain_id", &self.chain_id)
			.field("validator", &self.validator)
			.field("authorization", &self.authorization.is_some())
			.finish()
	}
}

/// Everything a handle is built from.
pub struct AccountParts {
	pub address: Address,
	pub chain_id: u64,
	pub entry_point: Address,
	pub kernel_implementation: Address,
	pub validator: ValidatorBinding,
	pub signer: Arc<dyn SignerInterface>,
	pub authorization: Option<AuthorizationGrant>,
	pub public_client: Arc<dyn PublicClientInterface>,
}

impl AccountHandle {
	pub fn new(parts: AccountParts) -> Self {
		Self {
			instance_id: Uuid::new_v4(),
			address: parts.address,
			chain_id: parts.chain_id,
			entry_point: parts.entry_point,
			kernel_implementation: parts.kernel_implementation,
			validator: parts.validator,
			signer: parts.signer,
			authorization: parts.authorization,
			public_client: parts.public_client,
		}
	}

	/// Same account, different validation and signer.
	///
	/// Used for session accounts; the result has its own instance id.
	pub fn with_validator(
		&self,
		validator: ValidatorBinding,
		signer: Arc<dyn SignerInterface>,
	) -> Self {
		Self {
			instance_id: Uuid::new_v4(),
			validator,
			signer,
			..self.clone()
		}
	}

	pub fn instance_id(&self) -> Uuid {
		self.instance_id
	}

	pub fn address(&self) -> Address {
		self.address
	}

	pub fn chain_id(&self) -> u64 {
		self.chain_id
	}

	pub fn entry_point(&self) -> Address {
		self.entry_point
	}

	pub fn kernel_implementation(&self) -> Address {
		self.kernel_implementation
	}

	pub fn validator(&self) -> &ValidatorBinding {
		&self.validator
	}

	pub fn signer(&self) -> &Arc<dyn SignerInterface> {
		&self.signer
	}

	pub fn authorization(&self) -> Option<&AuthorizationGrant> {
		self.authorization.as_ref()
	}

	pub fn public_client(&self) -> &Arc<dyn PublicClientInterface> {
		&self.public_client
	}

	/// Whether the account's code currently delegates to the Kernel.
	///
	/// Always read from the chain.
	pub async fn is_deployed(&self) -> Result<bool, SmartAccountError> {
		let code = self.public_client.get_code(self.address).await?;
		Ok(kernel::is_delegated_to(&code, self.kernel_implementation))
	}

	/// Whether a module of `module_type` is installed on the account.
	pub async fn is_module_installed(
		&self,
		module_type: u8,
		module: Address,
	) -> Result<bool, SmartAccountError> {
		let data = self
			.public_client
			.call(self.address, kernel::is_module_installed_calldata(module_type, module))
			.await?;
		kernel::decode_is_module_installed(&data).map_err(|e| {
			SmartAccountError::Encoding(format!("Failed to decode isModuleInstalled: {}", e))
		})
	}

	/// Whether `validation` is installed, judged by the hook in its `validationConfig`.
	pub async fn is_validation_installed(
		&self,
		validation: ValidationType,
	) -> Result<bool, SmartAccountError> {
		let data = self
			.public_client
			.call(self.address, kernel::validation_config_calldata(validation))
			.await?;
		kernel::decode_validation_installed(&data).map_err(|e| {
			SmartAccountError::Encoding(format!("Failed to decode validationConfig: {}", e))
		})
	}
}
