//! Credential signer adapters for the account-abstraction playground.
//!
//! Every wallet-credential provider is normalized behind [`SignerInterface`].
//! The concrete back ends are a local private key, a hosted wallet session
//! reached over JSON-RPC (Privy-like and Dynamic-like) and a custodial
//! signing API (Turnkey-like). [`SignerProvider`] dispatches between them.

use alloy_consensus::TxLegacy;
use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes, Signature};
use async_trait::async_trait;
use thiserror::Error;
use wallet_types::{AuthorizationGrant, ImplementationRegistry};

/// Tagged dispatch over the signer back ends.
pub mod signer;

pub use signer::SignerProvider;

/// Re-export implementations
pub mod implementations {
	pub mod custodial;
	pub mod hosted;
	pub mod local;
}

pub use implementations::custodial::{CustodialSessionConfig, CustodialSigner};
pub use implementations::hosted::{HostedFlavor, HostedSessionConfig, HostedSessionSigner};
pub use implementations::local::LocalSigner;

/// Connector name hosted wallets must report to be usable with Kernel accounts.
pub const ZERODEV_CONNECTOR: &str = "zerodev";

/// Errors that can occur during signer operations.
#[derive(Debug, Error)]
pub enum AccountError {
	/// The provider has no authenticated session.
	#[error("No active session: {0}")]
	NoSession(String),
	/// The provider's wallet connector cannot drive a smart account.
	#[error("Unsupported connector: {0}")]
	UnsupportedConnector(String),
	/// The signer does not support the requested operation.
	#[error("Unsupported operation: {0}")]
	UnsupportedOperation(String),
	/// Error that occurs when signing operations fail.
	#[error("Signing failed: {0}")]
	SigningFailed(String),
	/// Error that occurs when a cryptographic key is invalid or malformed.
	#[error("Invalid key: {0}")]
	InvalidKey(String),
	/// The provider back end failed or returned an unexpected payload.
	#[error("Remote signer error: {0}")]
	Remote(String),
}

/// Capability interface every credential provider is normalized to.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait SignerInterface: Send + Sync {
	/// Address of the EOA controlled by this signer.
	fn address(&self) -> Address;

	/// EIP-191 personal-sign over `message`.
	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError>;

	/// EIP-712 signature over `typed_data`.
	async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature, AccountError>;

	/// Signs an EIP-7702 authorization delegating this EOA to `delegate`.
	async fn sign_authorization(
		&self,
		delegate: Address,
		chain_id: u64,
		nonce: u64,
	) -> Result<AuthorizationGrant, AccountError>;

	/// Signs a legacy transaction and returns its raw encoding.
	///
	/// Signers that only drive smart accounts return `UnsupportedOperation`.
	async fn sign_transaction(&self, tx: TxLegacy) -> Result<Bytes, AccountError>;
}

/// Factory building a signer from its TOML table.
pub type SignerFactory = fn(&toml::Value) -> Result<SignerProvider, AccountError>;

/// Registry trait for config-driven signer implementations.
pub trait SignerRegistry: ImplementationRegistry<Factory = SignerFactory> {}

/// Returns (name, factory) for every config-driven signer implementation.
///
/// Hosted and custodial signers need live session credentials and are built
/// through their `connect` constructors instead.
pub fn get_all_implementations() -> Vec<(&'static str, SignerFactory)> {
	use implementations::local;

	vec![(local::Registry::NAME, local::Registry::factory())]
}

/// Creates the named signer from its configuration table.
pub fn create_signer(name: &str, config: &toml::Value) -> Result<SignerProvider, AccountError> {
	let (_, factory) = get_all_implementations()
		.into_iter()
		.find(|(impl_name, _)| *impl_name == name)
		.ok_or_else(|| {
			AccountError::UnsupportedOperation(format!(
				"Signer '{}' cannot be created from configuration",
				name
			))
		})?;
	factory(config)
}
