//! ERC-4337 v0.7 user operation.
//!
//! The struct mirrors the unpacked JSON-RPC representation accepted by
//! bundlers (`eth_sendUserOperation`). Hashing packs the gas fields the way
//! EntryPoint v0.7 does before computing the operation hash that validators
//! sign.

use crate::AuthorizationGrant;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256, U8};
use alloy_sol_types::SolValue;
use serde::{Deserialize, Serialize};

/// EIP-7702 authorization attached to a user operation for first-time
/// delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip7702Auth {
	pub chain_id: U256,
	pub address: Address,
	pub nonce: U256,
	pub y_parity: U8,
	pub r: U256,
	pub s: U256,
}

impl From<&AuthorizationGrant> for Eip7702Auth {
	fn from(grant: &AuthorizationGrant) -> Self {
		Self {
			chain_id: U256::from(grant.chain_id),
			address: grant.delegate,
			nonce: U256::from(grant.nonce),
			y_parity: U8::from(grant.signature.v() as u8),
			r: grant.signature.r(),
			s: grant.signature.s(),
		}
	}
}

/// Unpacked v0.7 user operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
	pub sender: Address,
	pub nonce: U256,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub factory: Option<Address>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub factory_data: Option<Bytes>,
	pub call_data: Bytes,
	pub call_gas_limit: U256,
	pub verification_gas_limit: U256,
	pub pre_verification_gas: U256,
	pub max_fee_per_gas: U256,
	pub max_priority_fee_per_gas: U256,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub paymaster: Option<Address>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub paymaster_verification_gas_limit: Option<U256>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub paymaster_post_op_gas_limit: Option<U256>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub paymaster_data: Option<Bytes>,
	pub signature: Bytes,
	#[serde(
		default,
		rename = "eip7702Auth",
		skip_serializing_if = "Option::is_none"
	)]
	pub eip7702_auth: Option<Eip7702Auth>,
}

impl UserOperation {
	/// `factory ‖ factoryData`, empty when no factory is set.
	pub fn init_code(&self) -> Bytes {
		match self.factory {
			Some(factory) => {
				let data = self.factory_data.clone().unwrap_or_default();
				[factory.as_slice(), data.as_ref()].concat().into()
			},
			None => Bytes::new(),
		}
	}

	/// `paymaster ‖ uint128 verificationGas ‖ uint128 postOpGas ‖ paymasterData`.
	pub fn paymaster_and_data(&self) -> Bytes {
		match self.paymaster {
			Some(paymaster) => {
				let verification = self.paymaster_verification_gas_limit.unwrap_or_default();
				let post_op = self.paymaster_post_op_gas_limit.unwrap_or_default();
				let data = self.paymaster_data.clone().unwrap_or_default();
				[
					paymaster.as_slice(),
					&low_u128(verification).to_be_bytes(),
					&low_u128(post_op).to_be_bytes(),
					data.as_ref(),
				]
				.concat()
				.into()
			},
			None => Bytes::new(),
		}
	}

	/// Computes the v0.7 operation hash for `entry_point` on `chain_id`.
	///
	/// The signature field is not part of the hash.
	pub fn hash(&self, entry_point: Address, chain_id: u64) -> B256 {
		let packed = (
			self.sender,
			self.nonce,
			keccak256(self.init_code()),
			keccak256(&self.call_data),
			pack_u128_pair(self.verification_gas_limit, self.call_gas_limit),
			self.pre_verification_gas,
			pack_u128_pair(self.max_priority_fee_per_gas, self.max_fee_per_gas),
			keccak256(self.paymaster_and_data()),
		)
			.abi_encode_params();

		keccak256((keccak256(packed), entry_point, U256::from(chain_id)).abi_encode_params())
	}
}

fn low_u128(value: U256) -> u128 {
	value.saturating_to::<u128>()
}

fn pack_u128_pair(high: U256, low: U256) -> B256 {
	let mut out = [0u8; 32];
	out[..16].copy_from_slice(&low_u128(high).to_be_bytes());
	out[16..].copy_from_slice(&low_u128(low).to_be_bytes());
	B256::from(out)
}
