//! Call policies for session keys.
//!
//! A [`CallPolicy`] lists which contract functions a session key may call
//! and which constraints their arguments must satisfy. Policies are only
//! encoded here; the on-chain call-policy module (v0.0.4) enforces them.

use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::{sol, SolCall, SolValue};
use serde::{Deserialize, Serialize};
use wallet_types::Call;

sol! {
	/// Argument rule as laid out by the call-policy module.
	struct ParamRule {
		uint8 condition;
		uint64 offset;
		bytes32[] params;
	}

	/// One permitted call as laid out by the call-policy module.
	struct Permission {
		uint8 callType;
		address target;
		bytes4 selector;
		uint256 valueLimit;
		ParamRule[] rules;
	}

	interface IERC20 {
		function transfer(address to, uint256 amount) external returns (bool);
	}
}

/// Plain `call` (as opposed to delegatecall).
const CALL_TYPE_CALL: u8 = 0x00;

/// Comparison applied to one argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamCondition {
	Equal,
	GreaterThan,
	LessThan,
	GreaterThanOrEqual,
	LessThanOrEqual,
	NotEqual,
}

impl ParamCondition {
	/// On-chain numbering.
	pub fn as_u8(&self) -> u8 {
		match self {
			ParamCondition::Equal => 0,
			ParamCondition::GreaterThan => 1,
			ParamCondition::LessThan => 2,
			ParamCondition::GreaterThanOrEqual => 3,
			ParamCondition::LessThanOrEqual => 4,
			ParamCondition::NotEqual => 5,
		}
	}
}

/// Constraint on the argument at `position` (0-based, static arguments only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentPredicate {
	pub position: u8,
	pub condition: ParamCondition,
	/// ABI word the argument is compared against.
	pub value: B256,
}

/// One function a session key may call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRule {
	pub target: Address,
	pub selector: FixedBytes<4>,
	pub value_limit: U256,
	pub predicates: Vec<ArgumentPredicate>,
}

/// Ordered permission rules; fixed once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPolicy {
	rules: Vec<PermissionRule>,
}

impl CallPolicy {
	pub fn new(rules: Vec<PermissionRule>) -> Self {
		Self { rules }
	}

	pub fn rules(&self) -> &[PermissionRule] {
		&self.rules
	}

	/// ERC-20 `transfer` on `token` to any non-zero recipient, strictly below
	/// `limit` whole tokens per call.
	pub fn token_transfer_limit(token: Address, decimals: u8, limit: u64) -> Self {
		let max_amount = U256::from(limit) * U256::from(10u64).pow(U256::from(decimals));
		Self::new(vec![PermissionRule {
			target: token,
			selector: IERC20::transferCall::SELECTOR.into(),
			value_limit: U256::ZERO,
			predicates: vec![
				ArgumentPredicate {
					position: 0,
					condition: ParamCondition::NotEqual,
					value: Address::ZERO.into_word(),
				},
				ArgumentPredicate {
					position: 1,
					condition: ParamCondition::LessThan,
					value: B256::from(max_amount),
				},
			],
		}])
	}

	/// Policy data for the call-policy module: `abi.encode(Permission[])`.
	pub fn encode(&self) -> Bytes {
		let permissions: Vec<Permission> = self
			.rules
			.iter()
			.map(|rule| Permission {
				callType: CALL_TYPE_CALL,
				target: rule.target,
				selector: rule.selector,
				valueLimit: rule.value_limit,
				rules: rule
					.predicates
					.iter()
					.map(|p| ParamRule {
						condition: p.condition.as_u8(),
						offset: u64::from(p.position) * 32,
						params: vec![p.value],
					})
					.collect(),
			})
			.collect();
		permissions.abi_encode().into()
	}
}

/// ERC-20 `transfer(to, amount)` call on `token`.
pub fn erc20_transfer(token: Address, to: Address, amount: U256) -> Call {
	Call::new(token, IERC20::transferCall { to, amount }.abi_encode())
}
