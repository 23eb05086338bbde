//! Bundler and paymaster payload types.

use crate::UserOperation;
use alloy_primitives::{Address, Bytes, B256, U256, U64};
use serde::{Deserialize, Serialize};

/// Transaction that included a user operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleReceipt {
	pub transaction_hash: B256,
	#[serde(default)]
	pub block_number: Option<U64>,
}

/// Result of `eth_getUserOperationReceipt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationReceipt {
	pub user_op_hash: B256,
	#[serde(default)]
	pub sender: Option<Address>,
	pub success: bool,
	/// Revert reason reported by the bundler, if any.
	#[serde(default)]
	pub reason: Option<String>,
	#[serde(default)]
	pub actual_gas_cost: Option<U256>,
	pub receipt: BundleReceipt,
}

impl UserOperationReceipt {
	/// Hash of the bundle transaction that carried the operation.
	pub fn transaction_hash(&self) -> B256 {
		self.receipt.transaction_hash
	}
}

/// Result of `eth_estimateUserOperationGas`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
	pub pre_verification_gas: U256,
	pub verification_gas_limit: U256,
	pub call_gas_limit: U256,
	#[serde(default)]
	pub paymaster_verification_gas_limit: Option<U256>,
	#[serde(default)]
	pub paymaster_post_op_gas_limit: Option<U256>,
}

impl GasEstimate {
	/// Copies the estimated limits onto an operation.
	pub fn apply(&self, op: &mut UserOperation) {
		op.pre_verification_gas = self.pre_verification_gas;
		op.verification_gas_limit = self.verification_gas_limit;
		op.call_gas_limit = self.call_gas_limit;
		if op.paymaster.is_some() {
			if let Some(limit) = self.paymaster_verification_gas_limit {
				op.paymaster_verification_gas_limit = Some(limit);
			}
			if let Some(limit) = self.paymaster_post_op_gas_limit {
				op.paymaster_post_op_gas_limit = Some(limit);
			}
		}
	}
}

/// Sponsorship returned by the paymaster.
///
/// Gas limits and fees are optional: some paymasters only return the
/// paymaster fields and expect the caller to estimate the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipData {
	pub paymaster: Address,
	#[serde(default)]
	pub paymaster_data: Bytes,
	pub paymaster_verification_gas_limit: U256,
	pub paymaster_post_op_gas_limit: U256,
	#[serde(default)]
	pub call_gas_limit: Option<U256>,
	#[serde(default)]
	pub verification_gas_limit: Option<U256>,
	#[serde(default)]
	pub pre_verification_gas: Option<U256>,
	#[serde(default)]
	pub max_fee_per_gas: Option<U256>,
	#[serde(default)]
	pub max_priority_fee_per_gas: Option<U256>,
}

impl SponsorshipData {
	/// Whether the sponsorship carries all account gas limits.
	pub fn has_gas_limits(&self) -> bool {
		self.call_gas_limit.is_some()
			&& self.verification_gas_limit.is_some()
			&& self.pre_verification_gas.is_some()
	}

	/// Copies the sponsorship fields onto an operation.
	pub fn apply(&self, op: &mut UserOperation) {
		op.paymaster = Some(self.paymaster);
		op.paymaster_data = Some(self.paymaster_data.clone());
		op.paymaster_verification_gas_limit = Some(self.paymaster_verification_gas_limit);
		op.paymaster_post_op_gas_limit = Some(self.paymaster_post_op_gas_limit);
		if let Some(v) = self.call_gas_limit {
			op.call_gas_limit = v;
		}
		if let Some(v) = self.verification_gas_limit {
			op.verification_gas_limit = v;
		}
		if let Some(v) = self.pre_verification_gas {
			op.pre_verification_gas = v;
		}
		if let Some(v) = self.max_fee_per_gas {
			op.max_fee_per_gas = v;
		}
		if let Some(v) = self.max_priority_fee_per_gas {
			op.max_priority_fee_per_gas = v;
		}
	}
}
