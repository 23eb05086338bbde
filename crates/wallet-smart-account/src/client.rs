//! User-operation submission for one account.
//!
//! The pipeline follows ERC-4337 v0.7: nonce from the EntryPoint, fees from
//! the chain, paymaster sponsorship over a dummy signature, a gas-estimation
//! fallback when the paymaster returns no limits, then the real signature
//! and submission. While the EOA is not yet delegated the authorization
//! rides along as `eip7702Auth`.

use crate::account::{AccountHandle, ValidatorBinding};
use crate::kernel::{self, ValidationMode, MODULE_TYPE_EXECUTOR, MODULE_TYPE_VALIDATOR};
use crate::SmartAccountError;
use alloy_primitives::{Address, Bytes, B256, U256};
use std::sync::Arc;
use tracing::instrument;
use wallet_delivery::{poll_until, BundlerInterface, PaymasterInterface, PollOutcome, PollPolicy};
use wallet_types::{truncate_id, Call, Eip7702Auth, UserOperation, UserOperationReceipt};

/// Sends calls from one [`AccountHandle`] through one bundler and paymaster.
///
/// Holds nothing beyond its bindings; a client for a different account or
/// chain is a new client.
#[derive(Clone)]
pub struct TransactionClient {
	account: AccountHandle,
	bundler: Arc<dyn BundlerInterface>,
	paymaster: Arc<dyn PaymasterInterface>,
	receipt_policy: PollPolicy,
}

impl std::fmt::Debug for TransactionClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TransactionClient")
			.field("account", &self.account)
			.field("receipt_policy", &self.receipt_policy)
			.finish_non_exhaustive()
	}
}

impl TransactionClient {
	pub fn new(
		account: AccountHandle,
		bundler: Arc<dyn BundlerInterface>,
		paymaster: Arc<dyn PaymasterInterface>,
		receipt_policy: PollPolicy,
	) -> Self {
		Self {
			account,
			bundler,
			paymaster,
			receipt_policy,
		}
	}

	/// A client for `account` sharing this client's remote services.
	pub fn for_account(&self, account: AccountHandle) -> Self {
		Self {
			account,
			..self.clone()
		}
	}

	pub fn account(&self) -> &AccountHandle {
		&self.account
	}

	pub fn chain_id(&self) -> u64 {
		self.account.chain_id()
	}

	/// Submits `calls` as one user operation and returns its hash.
	#[instrument(
		skip_all,
		fields(
			chain_id = self.account.chain_id(),
			sender = %self.account.address(),
			calls = calls.len()
		)
	)]
	pub async fn send_user_operation(&self, calls: &[Call]) -> Result<B256, SmartAccountError> {
		let (mut op, mode) = self.prepare_user_operation(calls).await?;

		let hash = op.hash(self.account.entry_point(), self.account.chain_id());
		let signature = self.account.signer().sign_message(hash.as_slice()).await?;
		op.signature = self
			.account
			.validator()
			.wrap_signature(mode, &signature.as_bytes());

		let submitted = self
			.bundler
			.send_user_operation(&op, self.account.entry_point())
			.await?;
		tracing::info!(
			user_op_hash = %truncate_id(&submitted.to_string()),
			delegating = op.eip7702_auth.is_some(),
			"User operation submitted"
		);
		Ok(submitted)
	}

	/// Submits `calls`, waits for inclusion and returns the bundle transaction hash.
	pub async fn send_transaction(&self, calls: &[Call]) -> Result<B256, SmartAccountError> {
		let user_op_hash = self.send_user_operation(calls).await?;
		let receipt = self.wait_for_operation_receipt(user_op_hash).await?;
		if !receipt.success {
			return Err(SmartAccountError::RemoteRejection(format!(
				"User operation {} reverted: {}",
				user_op_hash,
				receipt.reason.as_deref().unwrap_or("no reason given")
			)));
		}
		Ok(receipt.transaction_hash())
	}

	/// Polls the bundler for the receipt of `hash` within the receipt budget.
	pub async fn wait_for_operation_receipt(
		&self,
		hash: B256,
	) -> Result<UserOperationReceipt, SmartAccountError> {
		let bundler = self.bundler.clone();
		let outcome = poll_until(&self.receipt_policy, |_| {
			let bundler = bundler.clone();
			async move { bundler.get_user_operation_receipt(hash).await }
		})
		.await?;

		match outcome {
			PollOutcome::Ready { value, attempts } => {
				tracing::debug!(
					user_op_hash = %truncate_id(&hash.to_string()),
					attempts,
					success = value.success,
					"User operation receipt received"
				);
				Ok(value)
			},
			PollOutcome::Inconclusive { attempts } => {
				tracing::warn!(
					user_op_hash = %truncate_id(&hash.to_string()),
					attempts,
					"No user operation receipt within polling budget"
				);
				Err(SmartAccountError::Inconclusive { attempts })
			},
		}
	}

	/// Installs a validator module through a self-call.
	pub async fn install_validator(
		&self,
		validator: Address,
		validator_data: Bytes,
		hook_data: Bytes,
		selector_data: Bytes,
	) -> Result<B256, SmartAccountError> {
		let install = kernel::install_module_call(
			self.account.address(),
			MODULE_TYPE_VALIDATOR,
			validator,
			kernel::validator_init_data(validator_data, hook_data, selector_data),
		);
		self.send_transaction(&[install]).await
	}

	/// Installs an executor module; the self-call is followed by an empty call.
	#[instrument(skip_all, fields(chain_id = self.account.chain_id(), executor = %executor))]
	pub async fn install_executor(
		&self,
		executor: Address,
		executor_data: Bytes,
	) -> Result<B256, SmartAccountError> {
		let install = kernel::install_module_call(
			self.account.address(),
			MODULE_TYPE_EXECUTOR,
			executor,
			kernel::executor_init_data(executor_data, Bytes::new()),
		);
		self.send_transaction(&[install, Call::noop()]).await
	}

	/// Builds a sponsored, gas-limited operation carrying a dummy signature.
	async fn prepare_user_operation(
		&self,
		calls: &[Call],
	) -> Result<(UserOperation, ValidationMode), SmartAccountError> {
		let account = &self.account;
		let public = account.public_client();
		let mode = self.validation_mode().await?;

		let key = kernel::nonce_key(mode, account.validator().validation_type());
		let nonce_data = public
			.call(
				account.entry_point(),
				kernel::get_nonce_calldata(account.address(), key),
			)
			.await?;
		let nonce = kernel::decode_nonce(&nonce_data)
			.map_err(|e| SmartAccountError::Encoding(format!("Failed to decode nonce: {}", e)))?;

		let eip7702_auth = if account.is_deployed().await? {
			None
		} else {
			let grant = account.authorization().ok_or_else(|| {
				SmartAccountError::PrerequisiteMissing("EIP-7702 authorization".into())
			})?;
			Some(Eip7702Auth::from(grant))
		};

		let fees = public.estimate_fees().await?;

		let mut op = UserOperation {
			sender: account.address(),
			nonce,
			call_data: kernel::encode_calls(calls),
			max_fee_per_gas: U256::from(fees.max_fee_per_gas),
			max_priority_fee_per_gas: U256::from(fees.max_priority_fee_per_gas),
			signature: account.validator().dummy_signature(mode),
			eip7702_auth,
			..Default::default()
		};

		let sponsorship = self
			.paymaster
			.sponsor_user_operation(&op, account.entry_point())
			.await?;
		sponsorship.apply(&mut op);

		if !sponsorship.has_gas_limits() {
			tracing::debug!("Paymaster returned no gas limits, estimating through bundler");
			let estimate = self
				.bundler
				.estimate_user_operation_gas(&op, account.entry_point())
				.await?;
			estimate.apply(&mut op);
		}

		Ok((op, mode))
	}

	/// Enable mode until a permission validation is installed on chain.
	async fn validation_mode(&self) -> Result<ValidationMode, SmartAccountError> {
		match self.account.validator() {
			ValidatorBinding::Sudo { .. } => Ok(ValidationMode::Default),
			ValidatorBinding::Permission(_) => {
				let installed = self
					.account
					.is_validation_installed(self.account.validator().validation_type())
					.await?;
				Ok(if installed {
					ValidationMode::Default
				} else {
					ValidationMode::Enable
				})
			},
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::account::AccountParts;
	use crate::kernel::IKernel;
	use alloy_primitives::{address, Signature, U64};
	use alloy_sol_types::{SolCall, SolValue};
	use std::sync::Mutex;
	use std::time::Duration;
	use wallet_account::{LocalSigner, SignerInterface};
	use wallet_delivery::{
		FeeEstimate, MockBundlerInterface, MockPaymasterInterface, MockPublicClientInterface,
	};
	use wallet_types::{BundleReceipt, GasEstimate, SponsorshipData};

	const KERNEL: Address = address!("d6CEDDe84be40893d153Be9d467CD6aD37875b28");
	const ENTRY_POINT: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");
	const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

	fn public(delegated: bool) -> MockPublicClientInterface {
		let mut public = MockPublicClientInterface::new();
		public.expect_get_code().returning(move |_| {
			Box::pin(async move {
				Ok(if delegated {
					kernel::delegation_designator(KERNEL)
				} else {
					Bytes::new()
				})
			})
		});
		public
			.expect_call()
			.withf(|to, _| *to == ENTRY_POINT)
			.returning(|_, _| Box::pin(async { Ok(Bytes::from(U256::from(4).abi_encode())) }));
		public.expect_estimate_fees().returning(|| {
			Box::pin(async {
				Ok(FeeEstimate {
					max_fee_per_gas: 2_000_000,
					max_priority_fee_per_gas: 1_000_000,
				})
			})
		});
		public
	}

	fn sponsorship(with_limits: bool) -> SponsorshipData {
		SponsorshipData {
			paymaster: Address::with_last_byte(0x99),
			paymaster_data: Bytes::from_static(&[1, 2]),
			paymaster_verification_gas_limit: U256::from(30_000),
			paymaster_post_op_gas_limit: U256::from(1),
			call_gas_limit: with_limits.then(|| U256::from(50_000)),
			verification_gas_limit: with_limits.then(|| U256::from(60_000)),
			pre_verification_gas: with_limits.then(|| U256::from(70_000)),
			max_fee_per_gas: None,
			max_priority_fee_per_gas: None,
		}
	}

	fn paymaster(with_limits: bool) -> MockPaymasterInterface {
		let mut paymaster = MockPaymasterInterface::new();
		paymaster
			.expect_sponsor_user_operation()
			.withf(|op, _| op.signature.len() == 65 && op.paymaster.is_none())
			.returning(move |_, _| Box::pin(async move { Ok(sponsorship(with_limits)) }));
		paymaster
	}

	fn receipt(success: bool) -> UserOperationReceipt {
		UserOperationReceipt {
			user_op_hash: B256::repeat_byte(0xab),
			sender: None,
			success,
			reason: (!success).then(|| "ERC20: transfer amount exceeds balance".to_string()),
			actual_gas_cost: None,
			receipt: BundleReceipt {
				transaction_hash: B256::repeat_byte(0xcd),
				block_number: Some(U64::from(9)),
			},
		}
	}

	async fn client(
		signer: LocalSigner,
		public: MockPublicClientInterface,
		bundler: MockBundlerInterface,
		paymaster: MockPaymasterInterface,
		authorized: bool,
	) -> TransactionClient {
		let authorization = if authorized {
			Some(signer.sign_authorization(KERNEL, 84532, 0).await.unwrap())
		} else {
			None
		};
		let account = AccountHandle::new(AccountParts {
			address: SignerInterface::address(&signer),
			chain_id: 84532,
			entry_point: ENTRY_POINT,
			kernel_implementation: KERNEL,
			validator: ValidatorBinding::Sudo {
				ecdsa_validator: Address::with_last_byte(0xec),
			},
			signer: Arc::new(signer),
			authorization,
			public_client: Arc::new(public),
		});
		TransactionClient::new(
			account,
			Arc::new(bundler),
			Arc::new(paymaster),
			PollPolicy::fixed(Duration::from_secs(1), 3),
		)
	}

	#[tokio::test]
	async fn test_first_operation_carries_authorization_and_signature() {
		let signer = LocalSigner::new(TEST_KEY).unwrap();
		let owner = SignerInterface::address(&signer);

		let mut bundler = MockBundlerInterface::new();
		bundler
			.expect_send_user_operation()
			.withf(move |op, entry_point| {
				let hash = op.hash(*entry_point, 84532);
				let recovered = Signature::from_raw(&op.signature)
					.ok()
					.and_then(|sig| sig.recover_address_from_msg(hash.as_slice()).ok());
				op.nonce == U256::from(4)
					&& op.call_gas_limit == U256::from(50_000)
					&& op.paymaster == Some(Address::with_last_byte(0x99))
					&& op.eip7702_auth.as_ref().map(|a| a.address) == Some(KERNEL)
					&& recovered == Some(owner)
			})
			.times(1)
			.returning(|_, _| Box::pin(async { Ok(B256::repeat_byte(0xab)) }));

		let client = client(signer, public(false), bundler, paymaster(true), true).await;
		let hash = client
			.send_user_operation(&[Call::new(
				address!("65A49dF64216bE58F8851A553863658dB7Fe301F"),
				Bytes::new(),
			)])
			.await
			.unwrap();
		assert_eq!(hash, B256::repeat_byte(0xab));
	}

	#[tokio::test]
	async fn test_missing_paymaster_limits_fall_back_to_estimation() {
		let mut bundler = MockBundlerInterface::new();
		bundler
			.expect_estimate_user_operation_gas()
			.times(1)
			.returning(|_, _| {
				Box::pin(async {
					Ok(GasEstimate {
						pre_verification_gas: U256::from(1_000),
						verification_gas_limit: U256::from(2_000),
						call_gas_limit: U256::from(3_000),
						paymaster_verification_gas_limit: None,
						paymaster_post_op_gas_limit: None,
					})
				})
			});
		bundler
			.expect_send_user_operation()
			.withf(|op, _| {
				op.call_gas_limit == U256::from(3_000)
					&& op.paymaster_verification_gas_limit == Some(U256::from(30_000))
					&& op.eip7702_auth.is_none()
			})
			.times(1)
			.returning(|_, _| Box::pin(async { Ok(B256::repeat_byte(1)) }));

		let client = client(
			LocalSigner::generate(),
			public(true),
			bundler,
			paymaster(false),
			false,
		)
		.await;
		client.send_user_operation(&[Call::noop()]).await.unwrap();
	}

	#[tokio::test]
	async fn test_undelegated_account_without_grant_is_prerequisite_missing() {
		let client = client(
			LocalSigner::generate(),
			public(false),
			MockBundlerInterface::new(),
			MockPaymasterInterface::new(),
			false,
		)
		.await;
		assert!(matches!(
			client.send_user_operation(&[Call::noop()]).await,
			Err(SmartAccountError::PrerequisiteMissing(_))
		));
	}

	#[tokio::test]
	async fn test_reverted_operation_is_remote_rejection() {
		let mut bundler = MockBundlerInterface::new();
		bundler
			.expect_send_user_operation()
			.returning(|_, _| Box::pin(async { Ok(B256::repeat_byte(0xab)) }));
		bundler
			.expect_get_user_operation_receipt()
			.returning(|_| Box::pin(async { Ok(Some(receipt(false))) }));

		let client = client(
			LocalSigner::generate(),
			public(true),
			bundler,
			paymaster(true),
			false,
		)
		.await;
		let err = client.send_transaction(&[Call::noop()]).await.unwrap_err();
		assert!(err.is_remote_rejection());
		assert!(err.to_string().contains("transfer amount exceeds balance"));
	}

	#[tokio::test]
	async fn test_send_transaction_returns_bundle_hash() {
		let mut bundler = MockBundlerInterface::new();
		bundler
			.expect_send_user_operation()
			.returning(|_, _| Box::pin(async { Ok(B256::repeat_byte(0xab)) }));
		let mut seq = mockall::Sequence::new();
		bundler
			.expect_get_user_operation_receipt()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_| Box::pin(async { Ok(None) }));
		bundler
			.expect_get_user_operation_receipt()
			.times(1)
			.in_sequence(&mut seq)
			.returning(|_| Box::pin(async { Ok(Some(receipt(true))) }));

		let client = client(
			LocalSigner::generate(),
			public(true),
			bundler,
			paymaster(true),
			false,
		)
		.await;
		assert_eq!(
			client.send_transaction(&[Call::noop()]).await.unwrap(),
			B256::repeat_byte(0xcd)
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_receipt_wait_is_inconclusive_after_budget() {
		let mut bundler = MockBundlerInterface::new();
		bundler
			.expect_get_user_operation_receipt()
			.times(3)
			.returning(|_| Box::pin(async { Ok(None) }));

		let client = client(
			LocalSigner::generate(),
			MockPublicClientInterface::new(),
			bundler,
			MockPaymasterInterface::new(),
			false,
		)
		.await;
		assert!(matches!(
			client.wait_for_operation_receipt(B256::ZERO).await,
			Err(SmartAccountError::Inconclusive { attempts: 3 })
		));
	}

	#[tokio::test]
	async fn test_install_executor_prepends_self_call() {
		let captured: Arc<Mutex<Option<UserOperation>>> = Arc::default();
		let sink = captured.clone();

		let mut bundler = MockBundlerInterface::new();
		bundler.expect_send_user_operation().returning(move |op, _| {
			*sink.lock().unwrap() = Some(op.clone());
			Box::pin(async { Ok(B256::repeat_byte(0xab)) })
		});
		bundler
			.expect_get_user_operation_receipt()
			.returning(|_| Box::pin(async { Ok(Some(receipt(true))) }));

		let client = client(
			LocalSigner::generate(),
			public(true),
			bundler,
			paymaster(true),
			false,
		)
		.await;
		let executor = Address::with_last_byte(0xee);
		client.install_executor(executor, Bytes::new()).await.unwrap();

		let op = captured.lock().unwrap().take().unwrap();
		let execute = IKernel::executeCall::abi_decode(&op.call_data).unwrap();
		assert_eq!(execute.execMode[0], 0x01);
		let executions = Vec::<kernel::Execution>::abi_decode(&execute.executionCalldata).unwrap();
		assert_eq!(executions.len(), 2);
		assert_eq!(executions[0].target, client.account().address());
		let install = IKernel::installModuleCall::abi_decode(&executions[0].callData).unwrap();
		assert_eq!(install.module, executor);
		assert_eq!(install.moduleType, U256::from(2));
		assert_eq!(executions[1].target, Address::ZERO);
	}

	#[tokio::test]
	async fn test_install_validator_is_single_self_call() {
		let captured: Arc<Mutex<Option<UserOperation>>> = Arc::default();
		let sink = captured.clone();

		let mut bundler = MockBundlerInterface::new();
		bundler.expect_send_user_operation().returning(move |op, _| {
			*sink.lock().unwrap() = Some(op.clone());
			Box::pin(async { Ok(B256::repeat_byte(0xab)) })
		});
		bundler
			.expect_get_user_operation_receipt()
			.returning(|_| Box::pin(async { Ok(Some(receipt(true))) }));

		let client = client(
			LocalSigner::generate(),
			public(true),
			bundler,
			paymaster(true),
			false,
		)
		.await;
		let validator = Address::with_last_byte(0x5e);
		let owner = Bytes::copy_from_slice(client.account().address().as_slice());
		client
			.install_validator(validator, owner.clone(), Bytes::new(), Bytes::new())
			.await
			.unwrap();

		let op = captured.lock().unwrap().take().unwrap();
		let execute = IKernel::executeCall::abi_decode(&op.call_data).unwrap();
		assert_eq!(execute.execMode, B256::ZERO);
		let packed = execute.executionCalldata;
		assert_eq!(&packed[..20], client.account().address().as_slice());
		let install = IKernel::installModuleCall::abi_decode(&packed[52..]).unwrap();
		assert_eq!(install.moduleType, U256::from(1));
		assert_eq!(install.module, validator);
		assert_eq!(&install.initData[..20], Address::ZERO.as_slice());
		let (validator_data, hook_data, selector_data) =
			<(Bytes, Bytes, Bytes)>::abi_decode_params(&install.initData[20..]).unwrap();
		assert_eq!(validator_data, owner);
		assert!(hook_data.is_empty() && selector_data.is_empty());
	}
}
