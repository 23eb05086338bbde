//! Session-key lifecycle.
//!
//! A session key moves through typed states: [`SessionKey<Derived>`] holds a
//! fresh ephemeral key, [`SessionKey<PolicyBound>`] adds its call policy and
//! installing it yields a [`SessionAccount`]. A session account serializes to
//! a [`SerializedSessionKey`] and restores from one without touching the key.

use crate::policy::CallPolicy;
use crate::{SessionError, SessionModules};
use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, B256};
use alloy_sol_types::SolValue;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wallet_account::{LocalSigner, SignerInterface};
use wallet_smart_account::kernel::{self, Enable, ValidationType};
use wallet_smart_account::{
	AccountHandle, PermissionValidation, SmartAccountError, TransactionClient, ValidatorBinding,
};
use wallet_types::Call;

const TOKEN_VERSION: u8 = 1;

/// Flag prefix of each policy and signer entry in the validator data.
const ENTRY_FLAG: [u8; 2] = [0x00, 0x00];

/// Fresh ephemeral key, no policy yet.
pub struct Derived;

/// Ephemeral key with its policy attached.
pub struct PolicyBound {
	policy: CallPolicy,
}

/// A session key in state `S`.
pub struct SessionKey<S> {
	signer: LocalSigner,
	state: S,
}

impl<S> SessionKey<S> {
	/// Address of the ephemeral signer.
	pub fn address(&self) -> Address {
		SignerInterface::address(&self.signer)
	}
}

impl SessionKey<Derived> {
	pub fn derive() -> Self {
		Self {
			signer: LocalSigner::generate(),
			state: Derived,
		}
	}

	pub fn bind_policy(self, policy: CallPolicy) -> SessionKey<PolicyBound> {
		SessionKey {
			signer: self.signer,
			state: PolicyBound { policy },
		}
	}
}

impl SessionKey<PolicyBound> {
	pub fn policy(&self) -> &CallPolicy {
		&self.state.policy
	}

	/// Enables the permission on `root`'s account and returns the session account.
	///
	/// The root signer signs the `Enable` message now; the permission is
	/// installed on chain by the first operation the session key sends.
	pub async fn install(
		self,
		root: &TransactionClient,
		modules: &SessionModules,
	) -> Result<SessionAccount, SessionError> {
		let account = root.account();
		let validator_data = validator_data(modules, &self.state.policy, self.address());
		let permission_id = permission_id(&validator_data);
		let nonce = enable_nonce(account).await?;

		let enable = Enable {
			validationId: ValidationType::Permission(permission_id).validation_id(),
			nonce,
			hook: Address::ZERO,
			validatorData: validator_data,
			hookData: Bytes::new(),
			selectorData: kernel::execute_selector_data(),
		};
		let typed_data = kernel::enable_typed_data(&enable, account.address(), account.chain_id());
		let enable_signature = account
			.signer()
			.sign_typed_data(&typed_data)
			.await?
			.as_bytes();

		tracing::info!(
			account = %account.address(),
			session_key = %self.address(),
			permission_id = %permission_id,
			"Session key enabled by root signer"
		);

		Ok(SessionAccount::assemble(
			root,
			self.signer,
			self.state.policy,
			PermissionValidation {
				permission_id,
				enable,
				enable_signature: Bytes::copy_from_slice(&enable_signature),
			},
		))
	}
}

/// `abi.encode(bytes[])` of the policy entries followed by the signer entry.
fn validator_data(modules: &SessionModules, policy: &CallPolicy, session_key: Address) -> Bytes {
	let entries: Vec<Bytes> = vec![
		[
			ENTRY_FLAG.as_slice(),
			modules.call_policy.as_slice(),
			policy.encode().as_ref(),
		]
		.concat()
		.into(),
		[
			ENTRY_FLAG.as_slice(),
			modules.ecdsa_signer.as_slice(),
			session_key.as_slice(),
		]
		.concat()
		.into(),
	];
	entries.abi_encode().into()
}

fn permission_id(validator_data: &[u8]) -> FixedBytes<4> {
	FixedBytes::from_slice(&keccak256(validator_data)[..4])
}

/// Kernel validation nonce; an account without code has not consumed any.
async fn enable_nonce(account: &AccountHandle) -> Result<u32, SessionError> {
	let data = account
		.public_client()
		.call(account.address(), kernel::current_nonce_calldata())
		.await
		.map_err(SmartAccountError::from)?;
	if data.is_empty() {
		return Ok(1);
	}
	kernel::decode_current_nonce(&data).map_err(|e| {
		SmartAccountError::Encoding(format!("Failed to decode currentNonce: {}", e)).into()
	})
}

/// The root account acting through a permission validator and a session key.
pub struct SessionAccount {
	key: LocalSigner,
	policy: CallPolicy,
	permission: PermissionValidation,
	client: TransactionClient,
}

impl SessionAccount {
	fn assemble(
		root: &TransactionClient,
		key: LocalSigner,
		policy: CallPolicy,
		permission: PermissionValidation,
	) -> Self {
		let handle = root.account().with_validator(
			ValidatorBinding::Permission(permission.clone()),
			Arc::new(key.clone()),
		);
		Self {
			key,
			policy,
			permission,
			client: root.for_account(handle),
		}
	}

	pub fn address(&self) -> Address {
		self.client.account().address()
	}

	pub fn session_key_address(&self) -> Address {
		SignerInterface::address(&self.key)
	}

	pub fn signer(&self) -> &dyn SignerInterface {
		&self.key
	}

	pub fn policy(&self) -> &CallPolicy {
		&self.policy
	}

	pub fn permission_id(&self) -> FixedBytes<4> {
		self.permission.permission_id
	}

	pub fn handle(&self) -> &AccountHandle {
		self.client.account()
	}

	pub fn client(&self) -> &TransactionClient {
		&self.client
	}

	/// Submits `calls` through the session key and returns the user-operation hash.
	pub async fn send_user_operation(&self, calls: &[Call]) -> Result<B256, SessionError> {
		self.client
			.send_user_operation(calls)
			.await
			.map_err(SessionError::from_client)
	}

	/// Submits `calls` through the session key and waits for inclusion.
	pub async fn send_transaction(&self, calls: &[Call]) -> Result<B256, SessionError> {
		self.client
			.send_transaction(calls)
			.await
			.map_err(SessionError::from_client)
	}

	/// Opaque token restoring this session account.
	pub fn serialize(&self) -> Result<SerializedSessionKey, SessionError> {
		let account = self.client.account();
		let payload = SessionKeyPayload {
			version: TOKEN_VERSION,
			chain_id: account.chain_id(),
			account: account.address(),
			session_private_key: self.key.private_key_hex(),
			permission_id: self.permission.permission_id,
			enable_nonce: self.permission.enable.nonce,
			validator_data: self.permission.enable.validatorData.clone(),
			selector_data: self.permission.enable.selectorData.clone(),
			enable_signature: self.permission.enable_signature.clone(),
			policy: self.policy.clone(),
		};
		let json = serde_json::to_vec(&payload).map_err(|e| {
			SessionError::Serialization(format!("Failed to encode session key: {}", e))
		})?;
		Ok(SerializedSessionKey(STANDARD.encode(json)))
	}

	/// Restores a session account for `root` from `token`.
	///
	/// The token must describe `root`'s account on `root`'s chain.
	pub fn deserialize(
		token: &SerializedSessionKey,
		root: &TransactionClient,
	) -> Result<Self, SessionError> {
		let json = STANDARD
			.decode(token.as_str())
			.map_err(|e| SessionError::Deserialization(format!("Invalid base64: {}", e)))?;
		let payload: SessionKeyPayload = serde_json::from_slice(&json)
			.map_err(|e| SessionError::Deserialization(format!("Invalid payload: {}", e)))?;

		if payload.version != TOKEN_VERSION {
			return Err(SessionError::Deserialization(format!(
				"Unsupported token version {}",
				payload.version
			)));
		}
		let account = root.account();
		if payload.account != account.address() || payload.chain_id != account.chain_id() {
			return Err(SessionError::Deserialization(format!(
				"Token belongs to {} on chain {}",
				payload.account, payload.chain_id
			)));
		}
		if permission_id(&payload.validator_data) != payload.permission_id {
			return Err(SessionError::Deserialization(
				"Permission id does not match validator data".into(),
			));
		}
		let key = LocalSigner::new(&payload.session_private_key)
			.map_err(|e| SessionError::Deserialization(format!("Invalid session key: {}", e)))?;

		let enable = Enable {
			validationId: ValidationType::Permission(payload.permission_id).validation_id(),
			nonce: payload.enable_nonce,
			hook: Address::ZERO,
			validatorData: payload.validator_data,
			hookData: Bytes::new(),
			selectorData: payload.selector_data,
		};
		Ok(Self::assemble(
			root,
			key,
			payload.policy,
			PermissionValidation {
				permission_id: payload.permission_id,
				enable,
				enable_signature: payload.enable_signature,
			},
		))
	}
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionKeyPayload {
	version: u8,
	chain_id: u64,
	account: Address,
	session_private_key: String,
	permission_id: FixedBytes<4>,
	enable_nonce: u32,
	validator_data: Bytes,
	selector_data: Bytes,
	enable_signature: Bytes,
	policy: CallPolicy,
}

/// Base64 token carrying a session key and its enable data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SerializedSessionKey(String);

impl SerializedSessionKey {
	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<String> for SerializedSessionKey {
	fn from(token: String) -> Self {
		Self(token)
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use alloy_primitives::{address, Signature, U256};
	use std::time::Duration;
	use wallet_delivery::{
		DeliveryError, FeeEstimate, MockBundlerInterface, MockPaymasterInterface,
		MockPublicClientInterface, PollPolicy,
	};
	use wallet_smart_account::kernel::{IEntryPoint, IKernel, ValidationConfig};
	use wallet_smart_account::AccountParts;
	use wallet_types::{BundleReceipt, SponsorshipData, UserOperationReceipt};
	use alloy_sol_types::SolCall;

	pub const KERNEL: Address = address!("d6CEDDe84be40893d153Be9d467CD6aD37875b28");
	pub const ENTRY_POINT: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");
	pub const TOKEN: Address = address!("fe4e9A244DC5Aa212a2e166B670Ebccea112B099");
	pub const ROOT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	pub fn modules() -> SessionModules {
		SessionModules {
			call_policy: address!("9a52283276a0ec8740df50bf01b28a80d880eaf2"),
			ecdsa_signer: address!("6a6f069e2a08c2468e7724ab3250cdbfba14d4ff"),
		}
	}

	/// Public client answering the Kernel and EntryPoint reads of a delegated account.
	pub fn delegated_public(permission_installed: bool) -> MockPublicClientInterface {
		let mut public = MockPublicClientInterface::new();
		public
			.expect_get_code()
			.returning(|_| Box::pin(async { Ok(kernel::delegation_designator(KERNEL)) }));
		public.expect_call().returning(move |to, data| {
			let response: Vec<u8> = if to == ENTRY_POINT {
				// EntryPoint nonces carry their key in the upper 192 bits
				let key = IEntryPoint::getNonceCall::abi_decode(&data).unwrap().key;
				(U256::from_be_slice(&key.to_be_bytes::<24>()) << 64usize).abi_encode()
			} else if data.starts_with(&IKernel::currentNonceCall::SELECTOR) {
				2u32.abi_encode()
			} else {
				ValidationConfig {
					nonce: 2,
					hook: if permission_installed {
						Address::with_last_byte(1)
					} else {
						Address::ZERO
					},
				}
				.abi_encode()
			};
			Box::pin(async move { Ok(Bytes::from(response)) })
		});
		public.expect_estimate_fees().returning(|| {
			Box::pin(async {
				Ok(FeeEstimate {
					max_fee_per_gas: 2,
					max_priority_fee_per_gas: 1,
				})
			})
		});
		public
	}

	pub fn root_client(
		public: MockPublicClientInterface,
		bundler: MockBundlerInterface,
		paymaster: MockPaymasterInterface,
	) -> TransactionClient {
		let signer = LocalSigner::new(ROOT_KEY).unwrap();
		let account = AccountHandle::new(AccountParts {
			address: SignerInterface::address(&signer),
			chain_id: 84532,
			entry_point: ENTRY_POINT,
			kernel_implementation: KERNEL,
			validator: ValidatorBinding::Sudo {
				ecdsa_validator: Address::with_last_byte(0xec),
			},
			signer: Arc::new(signer),
			authorization: None,
			public_client: Arc::new(public),
		});
		TransactionClient::new(
			account,
			Arc::new(bundler),
			Arc::new(paymaster),
			PollPolicy::fixed(Duration::from_millis(10), 3),
		)
	}

	fn idle_root() -> TransactionClient {
		root_client(
			delegated_public(false),
			MockBundlerInterface::new(),
			MockPaymasterInterface::new(),
		)
	}

	async fn installed(root: &TransactionClient) -> SessionAccount {
		SessionKey::derive()
			.bind_policy(CallPolicy::token_transfer_limit(TOKEN, 6, 10))
			.install(root, &modules())
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn test_install_signs_enable_with_root() {
		let root = idle_root();
		let session = installed(&root).await;

		assert_eq!(session.address(), root.account().address());
		assert_ne!(session.session_key_address(), root.account().address());
		assert_ne!(session.handle().instance_id(), root.account().instance_id());

		let ValidatorBinding::Permission(permission) = session.handle().validator() else {
			panic!("session account must use the permission validator");
		};
		assert_eq!(permission.enable.nonce, 2);
		let typed = kernel::enable_typed_data(&permission.enable, root.account().address(), 84532);
		let recovered = Signature::from_raw(&permission.enable_signature)
			.unwrap()
			.recover_address_from_prehash(&typed.eip712_signing_hash().unwrap())
			.unwrap();
		assert_eq!(recovered, root.account().address());
	}

	#[tokio::test]
	async fn test_serialized_key_restores_same_signer() {
		let root = idle_root();
		let session = installed(&root).await;
		let token = session.serialize().unwrap();

		let restored = SessionAccount::deserialize(&token, &root).unwrap();
		assert_eq!(restored.session_key_address(), session.session_key_address());
		assert_eq!(restored.permission_id(), session.permission_id());
		assert_eq!(restored.policy(), session.policy());
		assert_eq!(restored.handle().validator(), session.handle().validator());

		let message = b"session check";
		assert_eq!(
			restored.signer().sign_message(message).await.unwrap(),
			session.signer().sign_message(message).await.unwrap()
		);
	}

	#[tokio::test]
	async fn test_corrupt_tokens_are_deserialization_errors() {
		let root = idle_root();
		let corrupt = [
			"%%% not base64 %%%".to_string(),
			STANDARD.encode(b"{\"version\": 1}"),
			STANDARD.encode(b"\xff\xfe"),
		];
		for token in corrupt {
			assert!(matches!(
				SessionAccount::deserialize(&SerializedSessionKey::from(token), &root),
				Err(SessionError::Deserialization(_))
			));
		}
	}

	#[tokio::test]
	async fn test_token_for_other_account_is_rejected() {
		let root = idle_root();
		let token = installed(&root).await.serialize().unwrap();

		let foreign = AccountHandle::new(AccountParts {
			address: Address::with_last_byte(0x42),
			chain_id: 84532,
			entry_point: ENTRY_POINT,
			kernel_implementation: KERNEL,
			validator: root.account().validator().clone(),
			signer: root.account().signer().clone(),
			authorization: None,
			public_client: root.account().public_client().clone(),
		});
		assert!(matches!(
			SessionAccount::deserialize(&token, &root.for_account(foreign)),
			Err(SessionError::Deserialization(_))
		));
	}

	#[tokio::test]
	async fn test_first_session_operation_uses_enable_mode() {
		let mut paymaster = MockPaymasterInterface::new();
		paymaster.expect_sponsor_user_operation().returning(|_, _| {
			Box::pin(async {
				Ok(SponsorshipData {
					paymaster: Address::with_last_byte(0x99),
					paymaster_data: Bytes::new(),
					paymaster_verification_gas_limit: U256::from(1),
					paymaster_post_op_gas_limit: U256::from(1),
					call_gas_limit: Some(U256::from(1)),
					verification_gas_limit: Some(U256::from(1)),
					pre_verification_gas: Some(U256::from(1)),
					max_fee_per_gas: None,
					max_priority_fee_per_gas: None,
				})
			})
		});
		let mut bundler = MockBundlerInterface::new();
		bundler
			.expect_send_user_operation()
			.withf(|op, _| {
				let key = op.nonce.to_be_bytes::<32>();
				// uint192 key sits in the high 24 bytes: enable mode, permission type
				key[0] == 0x01 && key[1] == 0x02 && op.signature.len() > 66
			})
			.times(1)
			.returning(|_, _| Box::pin(async { Ok(B256::repeat_byte(7)) }));

		let root = root_client(delegated_public(false), bundler, paymaster);
		let session = installed(&root).await;
		let call = crate::policy::erc20_transfer(TOKEN, Address::with_last_byte(5), U256::from(1));
		assert_eq!(
			session.send_user_operation(&[call]).await.unwrap(),
			B256::repeat_byte(7)
		);
	}

	#[tokio::test]
	async fn test_rejected_session_operation_is_policy_violation() {
		let mut paymaster = MockPaymasterInterface::new();
		paymaster.expect_sponsor_user_operation().returning(|_, _| {
			Box::pin(async {
				Err(DeliveryError::Rejected {
					code: -32500,
					message: "AA23 reverted: call policy violation".into(),
				})
			})
		});
		let root = root_client(delegated_public(true), MockBundlerInterface::new(), paymaster);
		let session = installed(&root).await;

		let call = crate::policy::erc20_transfer(TOKEN, Address::with_last_byte(5), U256::MAX);
		assert!(matches!(
			session.send_transaction(&[call]).await,
			Err(SessionError::PolicyViolation(_))
		));
	}

	#[tokio::test]
	async fn test_reverted_session_operation_is_policy_violation() {
		let mut paymaster = MockPaymasterInterface::new();
		paymaster.expect_sponsor_user_operation().returning(|_, _| {
			Box::pin(async {
				Ok(SponsorshipData {
					paymaster: Address::with_last_byte(0x99),
					paymaster_data: Bytes::new(),
					paymaster_verification_gas_limit: U256::from(1),
					paymaster_post_op_gas_limit: U256::from(1),
					call_gas_limit: Some(U256::from(1)),
					verification_gas_limit: Some(U256::from(1)),
					pre_verification_gas: Some(U256::from(1)),
					max_fee_per_gas: None,
					max_priority_fee_per_gas: None,
				})
			})
		});
		let mut bundler = MockBundlerInterface::new();
		bundler
			.expect_send_user_operation()
			.withf(|op, _| op.signature.len() == 66 && op.signature[0] == 0xff)
			.returning(|_, _| Box::pin(async { Ok(B256::repeat_byte(7)) }));
		bundler.expect_get_user_operation_receipt().returning(|_| {
			Box::pin(async {
				Ok(Some(UserOperationReceipt {
					user_op_hash: B256::repeat_byte(7),
					sender: None,
					success: false,
					reason: None,
					actual_gas_cost: None,
					receipt: BundleReceipt {
						transaction_hash: B256::repeat_byte(8),
						block_number: None,
					},
				}))
			})
		});

		let root = root_client(delegated_public(true), bundler, paymaster);
		let session = installed(&root).await;
		let call = crate::policy::erc20_transfer(TOKEN, Address::with_last_byte(5), U256::from(1));
		assert!(matches!(
			session.send_transaction(&[call]).await,
			Err(SessionError::PolicyViolation(_))
		));
	}
}
