//! Kernel v3.3 (ERC-7579) encoding.
//!
//! Everything the workspace needs to talk to a Kernel account lives here:
//! execute-mode call encoding, module installation payloads, validation ids
//! and nonce keys, the EIP-7702 delegation designator and the EIP-712
//! `Enable` message used to install a permission validator on first use.

use alloy_dyn_abi::TypedData;
use alloy_primitives::{aliases::U192, hex, Address, Bytes, FixedBytes, B256, U256};
use alloy_sol_types::{eip712_domain, sol, SolCall, SolValue};
use wallet_types::Call;

// Solidity type definitions for Kernel and EntryPoint interactions.
sol! {
	/// ERC-7579 execution entry used in batch mode.
	struct Execution {
		address target;
		uint256 value;
		bytes callData;
	}

	/// Stored configuration of an installed validation.
	struct ValidationConfig {
		uint32 nonce;
		address hook;
	}

	/// EIP-712 payload the root validator signs to enable a new validation.
	#[derive(Debug, PartialEq, Eq, serde::Serialize)]
	struct Enable {
		bytes21 validationId;
		uint32 nonce;
		address hook;
		bytes validatorData;
		bytes hookData;
		bytes selectorData;
	}

	interface IKernel {
		function execute(bytes32 execMode, bytes executionCalldata) external payable;
		function installModule(uint256 moduleType, address module, bytes initData) external payable;
		function isModuleInstalled(uint256 moduleType, address module, bytes additionalContext) external view returns (bool);
		function currentNonce() external view returns (uint32);
		function validationConfig(bytes21 vId) external view returns (ValidationConfig memory config);
	}

	interface IEntryPoint {
		function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
	}
}

/// ERC-7579 module type of validators.
pub const MODULE_TYPE_VALIDATOR: u8 = 1;
/// ERC-7579 module type of executors.
pub const MODULE_TYPE_EXECUTOR: u8 = 2;

/// Prefix of an EIP-7702 delegation designator.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// Kernel EIP-712 domain name and version.
pub const KERNEL_NAME: &str = "Kernel";
pub const KERNEL_VERSION: &str = "0.3.3";

/// Hook bound to the `execute` selector when a validation is enabled.
pub const ONLY_ENTRYPOINT_HOOK: Address =
	alloy_primitives::address!("b230f0A1C7C95fa11001647383c8C7a8F316b900");

/// Placeholder ECDSA signature accepted by bundlers and paymasters during estimation.
pub const DUMMY_ECDSA_SIGNATURE: [u8; 65] = hex!(
	"fffffffffffffffffffffffffffffff0000000000000000000000000000000007aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1c"
);

/// Marker telling the permission validator to skip per-policy signatures.
const PERMISSION_SKIP_POLICIES: u8 = 0xff;

/// Call type of a delegatecall selector binding.
const CALL_TYPE_DELEGATE: u8 = 0xff;

/// How a validation is identified inside the Kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationType {
	/// The sudo validator; nonce keys carry no identifier.
	Root,
	/// A plain validator module identified by its address.
	Validator(Address),
	/// A permission identified by its 4-byte id.
	Permission(FixedBytes<4>),
}

impl ValidationType {
	fn type_byte(&self) -> u8 {
		match self {
			ValidationType::Root => 0x00,
			ValidationType::Validator(_) => 0x01,
			ValidationType::Permission(_) => 0x02,
		}
	}

	/// `type(1) ‖ identifier(20)` as stored by the Kernel.
	pub fn validation_id(&self) -> FixedBytes<21> {
		let mut id = [0u8; 21];
		id[0] = self.type_byte();
		match self {
			ValidationType::Root => {},
			ValidationType::Validator(address) => id[1..].copy_from_slice(address.as_slice()),
			ValidationType::Permission(permission_id) => {
				id[1..5].copy_from_slice(permission_id.as_slice())
			},
		}
		FixedBytes::from(id)
	}
}

/// Validation mode encoded in the first byte of the nonce key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
	Default,
	Enable,
}

/// EntryPoint nonce key: `mode(1) ‖ validationId(21) ‖ nonceKey(2)`.
pub fn nonce_key(mode: ValidationMode, validation: ValidationType) -> U192 {
	let mut key = [0u8; 24];
	key[0] = match mode {
		ValidationMode::Default => 0x00,
		ValidationMode::Enable => 0x01,
	};
	key[1..22].copy_from_slice(validation.validation_id().as_slice());
	U192::from_be_bytes(key)
}

/// Encodes calls for `execute`: single mode for one call, batch mode otherwise.
pub fn encode_calls(calls: &[Call]) -> Bytes {
	match calls {
		[call] => {
			let execution = [
				call.to.as_slice(),
				&call.value.to_be_bytes::<32>(),
				call.data.as_ref(),
			]
			.concat();
			IKernel::executeCall {
				execMode: B256::ZERO,
				executionCalldata: execution.into(),
			}
			.abi_encode()
			.into()
		},
		calls => {
			let executions: Vec<Execution> = calls
				.iter()
				.map(|call| Execution {
					target: call.to,
					value: call.value,
					callData: call.data.clone(),
				})
				.collect();
			let mut mode = [0u8; 32];
			mode[0] = 0x01;
			IKernel::executeCall {
				execMode: B256::from(mode),
				executionCalldata: executions.abi_encode().into(),
			}
			.abi_encode()
			.into()
		},
	}
}

/// Self-call installing `module` with the given init data.
pub fn install_module_call(
	account: Address,
	module_type: u8,
	module: Address,
	init_data: Bytes,
) -> Call {
	Call::new(
		account,
		IKernel::installModuleCall {
			moduleType: U256::from(module_type),
			module,
			initData: init_data,
		}
		.abi_encode(),
	)
}

/// Executor init data: `hook(20) ‖ abi.encode(executorData, hookData)` with no hook.
pub fn executor_init_data(executor_data: Bytes, hook_data: Bytes) -> Bytes {
	[
		Address::ZERO.as_slice(),
		&(executor_data, hook_data).abi_encode_params(),
	]
	.concat()
	.into()
}

/// Validator init data with no hook:
/// `hook(20) ‖ abi.encode(validatorData, hookData, selectorData)`.
pub fn validator_init_data(
	validator_data: Bytes,
	hook_data: Bytes,
	selector_data: Bytes,
) -> Bytes {
	[
		Address::ZERO.as_slice(),
		&(validator_data, hook_data, selector_data).abi_encode_params(),
	]
	.concat()
	.into()
}

/// Selector data granting a newly enabled validation access to `execute`.
pub fn execute_selector_data() -> Bytes {
	[
		IKernel::executeCall::SELECTOR.as_slice(),
		Address::ZERO.as_slice(),
		ONLY_ENTRYPOINT_HOOK.as_slice(),
		&(Bytes::from(vec![CALL_TYPE_DELEGATE]), Bytes::new()).abi_encode_params(),
	]
	.concat()
	.into()
}

/// Calldata for `isModuleInstalled(type, module, 0x)`.
pub fn is_module_installed_calldata(module_type: u8, module: Address) -> Bytes {
	IKernel::isModuleInstalledCall {
		moduleType: U256::from(module_type),
		module,
		additionalContext: Bytes::new(),
	}
	.abi_encode()
	.into()
}

/// Calldata for `EntryPoint.getNonce(sender, key)`.
pub fn get_nonce_calldata(sender: Address, key: U192) -> Bytes {
	IEntryPoint::getNonceCall { sender, key }.abi_encode().into()
}

/// Calldata for `validationConfig(vId)`.
pub fn validation_config_calldata(validation: ValidationType) -> Bytes {
	IKernel::validationConfigCall {
		vId: validation.validation_id(),
	}
	.abi_encode()
	.into()
}

/// Calldata for `currentNonce()`.
pub fn current_nonce_calldata() -> Bytes {
	IKernel::currentNonceCall {}.abi_encode().into()
}

pub fn decode_nonce(data: &[u8]) -> Result<U256, alloy_sol_types::Error> {
	IEntryPoint::getNonceCall::abi_decode_returns(data)
}

pub fn decode_is_module_installed(data: &[u8]) -> Result<bool, alloy_sol_types::Error> {
	IKernel::isModuleInstalledCall::abi_decode_returns(data)
}

pub fn decode_current_nonce(data: &[u8]) -> Result<u32, alloy_sol_types::Error> {
	IKernel::currentNonceCall::abi_decode_returns(data)
}

/// Whether a `validationConfig` result describes an installed validation.
pub fn decode_validation_installed(data: &[u8]) -> Result<bool, alloy_sol_types::Error> {
	let config = IKernel::validationConfigCall::abi_decode_returns(data)?;
	Ok(config.hook != Address::ZERO)
}

/// `0xef0100 ‖ implementation`.
pub fn delegation_designator(implementation: Address) -> Bytes {
	[DELEGATION_PREFIX.as_slice(), implementation.as_slice()]
		.concat()
		.into()
}

/// Whether `code` is exactly the designator for `implementation`.
pub fn is_delegated_to(code: &[u8], implementation: Address) -> bool {
	code.len() == 23 && code[..3] == DELEGATION_PREFIX && code[3..] == implementation[..]
}

/// Wraps an ECDSA signature for the permission validator.
pub fn permission_signature(signature: &[u8]) -> Bytes {
	[&[PERMISSION_SKIP_POLICIES], signature].concat().into()
}

/// Enable-mode user-operation signature:
/// `hook(20) ‖ abi.encode(validatorData, hookData, selectorData, enableSig, userOpSig)`.
pub fn enable_mode_signature(
	enable: &Enable,
	enable_signature: Bytes,
	user_op_signature: Bytes,
) -> Bytes {
	[
		enable.hook.as_slice(),
		&(
			enable.validatorData.clone(),
			enable.hookData.clone(),
			enable.selectorData.clone(),
			enable_signature,
			user_op_signature,
		)
			.abi_encode_params(),
	]
	.concat()
	.into()
}

/// EIP-712 typed data of an `Enable` message for `account` on `chain_id`.
pub fn enable_typed_data(enable: &Enable, account: Address, chain_id: u64) -> TypedData {
	let domain = eip712_domain! {
		name: KERNEL_NAME,
		version: KERNEL_VERSION,
		chain_id: chain_id,
		verifying_contract: account,
	};
	TypedData::from_struct(enable, Some(domain))
}
