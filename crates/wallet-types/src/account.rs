//! Call and authorization-grant types.

use alloy_eips::eip7702::{Authorization, SignedAuthorization};
use alloy_primitives::{Address, Bytes, Signature, B256, U256};
use serde::{Deserialize, Serialize};

/// A single call executed by a smart account.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Call {
	/// Call target.
	pub to: Address,
	/// Native value attached to the call.
	#[serde(default)]
	pub value: U256,
	/// Calldata.
	#[serde(default)]
	pub data: Bytes,
}

impl Call {
	/// Creates a call with no value.
	pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			to,
			value: U256::ZERO,
			data: data.into(),
		}
	}

	/// The empty call to the zero address used as a no-op operation.
	pub fn noop() -> Self {
		Self::default()
	}
}

/// A signed EIP-7702 delegation binding an EOA to a contract on one chain.
///
/// Created once per (EOA, chain) pair and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationGrant {
	pub chain_id: u64,
	pub nonce: u64,
	/// Contract the EOA delegates its code to.
	pub delegate: Address,
	pub signature: Signature,
}

impl AuthorizationGrant {
	/// The unsigned authorization tuple.
	pub fn authorization(&self) -> Authorization {
		unsigned_authorization(self.delegate, self.chain_id, self.nonce)
	}

	/// Converts into the alloy signed authorization carried by transactions.
	pub fn to_signed(&self) -> SignedAuthorization {
		self.authorization().into_signed(self.signature)
	}

	/// Recovers the EOA that produced the signature, if recoverable.
	pub fn authority(&self) -> Option<Address> {
		self.to_signed().recover_authority().ok()
	}
}

/// Builds the unsigned EIP-7702 authorization tuple.
pub fn unsigned_authorization(delegate: Address, chain_id: u64, nonce: u64) -> Authorization {
	Authorization {
		chain_id: U256::from(chain_id),
		address: delegate,
		nonce,
	}
}

/// Digest an EOA signs to authorize `delegate` on `chain_id` at `nonce`.
pub fn authorization_signing_hash(delegate: Address, chain_id: u64, nonce: u64) -> B256 {
	unsigned_authorization(delegate, chain_id, nonce).signature_hash()
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;

	#[test]
	fn test_grant_recovers_authority() {
		let signer: PrivateKeySigner =
			"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
				.parse()
				.unwrap();
		let delegate = address!("d6CEDDe84be40893d153Be9d467CD6aD37875b28");
		let hash = authorization_signing_hash(delegate, 84532, 0);
		let signature = signer.sign_hash_sync(&hash).unwrap();

		let grant = AuthorizationGrant {
			chain_id: 84532,
			nonce: 0,
			delegate,
			signature,
		};
		assert_eq!(grant.authority(), Some(signer.address()));
		assert_eq!(grant.authorization().address, delegate);

		// Same signature on a different chain binds a different authority.
		let other_chain = AuthorizationGrant {
			chain_id: 11155111,
			..grant
		};
		assert_ne!(other_chain.authority(), Some(signer.address()));
	}

	#[test]
	fn test_noop_call() {
		let call = Call::noop();
		assert_eq!(call.to, Address::ZERO);
		assert!(call.data.is_empty());
		assert_eq!(call.value, U256::ZERO);
	}
}
