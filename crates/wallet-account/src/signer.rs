//! Tagged dispatch over the signer back ends.
//!
//! Callers hold a `SignerProvider` (usually behind an `Arc<dyn SignerInterface>`)
//! without knowing which credential provider produced it.

use crate::implementations::{
	custodial::CustodialSigner, hosted::HostedSessionSigner, local::LocalSigner,
};
use crate::{AccountError, SignerInterface};
use alloy_consensus::TxLegacy;
use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes, Signature};
use async_trait::async_trait;
use wallet_types::{AuthorizationGrant, EmbeddedWallet, ProviderKind};

/// Signer produced by one of the credential providers.
#[derive(Debug)]
pub enum SignerProvider {
	/// Private key held in process.
	Local(LocalSigner),
	/// Hosted embedded wallet reached over JSON-RPC.
	HostedSession(HostedSessionSigner),
	/// Custodial signing API.
	CustodialIframe(CustodialSigner),
}

impl SignerProvider {
	/// User label reported by the back end, if any.
	pub fn user(&self) -> Option<String> {
		match self {
			Self::Local(s) => Some(s.address().to_string()),
			Self::HostedSession(s) => s.user().map(str::to_string),
			Self::CustodialIframe(s) => s.user().map(str::to_string),
		}
	}

	/// Read-only projection of the signed-in wallet for `provider`.
	pub fn embedded_wallet(&self, provider: ProviderKind) -> EmbeddedWallet {
		EmbeddedWallet {
			provider,
			address: self.address(),
			user: self.user(),
		}
	}
}

#[async_trait]
impl SignerInterface for SignerProvider {
	fn address(&self) -> Address {
		match self {
			Self::Local(s) => s.address(),
			Self::HostedSession(s) => s.address(),
			Self::CustodialIframe(s) => s.address(),
		}
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		match self {
			Self::Local(s) => s.sign_message(message).await,
			Self::HostedSession(s) => s.sign_message(message).await,
			Self::CustodialIframe(s) => s.sign_message(message).await,
		}
	}

	async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature, AccountError> {
		match self {
			Self::Local(s) => s.sign_typed_data(typed_data).await,
			Self::HostedSession(s) => s.sign_typed_data(typed_data).await,
			Self::CustodialIframe(s) => s.sign_typed_data(typed_data).await,
		}
	}

	async fn sign_authorization(
		&self,
		delegate: Address,
		chain_id: u64,
		nonce: u64,
	) -> Result<AuthorizationGrant, AccountError> {
		match self {
			Self::Local(s) => s.sign_authorization(delegate, chain_id, nonce).await,
			Self::HostedSession(s) => s.sign_authorization(delegate, chain_id, nonce).await,
			Self::CustodialIframe(s) => s.sign_authorization(delegate, chain_id, nonce).await,
		}
	}

	async fn sign_transaction(&self, tx: TxLegacy) -> Result<Bytes, AccountError> {
		match self {
			Self::Local(s) => s.sign_transaction(tx).await,
			Self::HostedSession(s) => s.sign_transaction(tx).await,
			Self::CustodialIframe(s) => s.sign_transaction(tx).await,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const TEST_PRIVATE_KEY: &str =
		"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	#[test]
	fn test_local_embedded_wallet_uses_address_as_user() {
		let signer = SignerProvider::Local(LocalSigner::new(TEST_PRIVATE_KEY).unwrap());
		let wallet = signer.embedded_wallet(ProviderKind::Local);
		assert_eq!(wallet.provider, ProviderKind::Local);
		assert_eq!(wallet.user, Some(wallet.address.to_string()));
	}

	#[tokio::test]
	async fn test_dispatch_reaches_local_signer() {
		let local = LocalSigner::new(TEST_PRIVATE_KEY).unwrap();
		let expected = local.sign_message(b"ping").await.unwrap();
		let signer = SignerProvider::Local(local);
		assert_eq!(signer.sign_message(b"ping").await.unwrap(), expected);
	}
}
