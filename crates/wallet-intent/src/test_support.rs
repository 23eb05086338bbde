//! Mock-backed transaction clients for intent tests.

use alloy_primitives::{address, Address, Bytes, B256, U256, U64};
use alloy_sol_types::{SolCall, SolValue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wallet_account::{LocalSigner, SignerInterface};
use wallet_delivery::{
	DeliveryError, FeeEstimate, MockBundlerInterface, MockPaymasterInterface,
	MockPublicClientInterface, PollPolicy,
};
use wallet_smart_account::kernel::{self, IKernel};
use wallet_smart_account::{AccountHandle, AccountParts, TransactionClient, ValidatorBinding};
use wallet_types::{BundleReceipt, SponsorshipData, UserOperationReceipt};

pub const KERNEL: Address = address!("d6CEDDe84be40893d153Be9d467CD6aD37875b28");
pub const ENTRY_POINT: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");
pub const EXECUTOR: Address = address!("8e3c2a2e9d3a4c1d6ba1de3b8c1f32c6f3a4e5b7");
pub const ROOT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

pub fn root_signer() -> LocalSigner {
	LocalSigner::new(ROOT_KEY).unwrap()
}

pub fn client_with(
	chain_id: u64,
	public: MockPublicClientInterface,
	bundler: MockBundlerInterface,
	paymaster: MockPaymasterInterface,
) -> TransactionClient {
	let signer = root_signer();
	let account = AccountHandle::new(AccountParts {
		address: SignerInterface::address(&signer),
		chain_id,
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

/// Client that must not touch any remote service.
pub fn idle_client(chain_id: u64) -> TransactionClient {
	client_with(
		chain_id,
		MockPublicClientInterface::new(),
		MockBundlerInterface::new(),
		MockPaymasterInterface::new(),
	)
}

/// Client for a delegated account whose executor becomes installed once an
/// operation is submitted.
///
/// `installed` is shared with the mocks: `isModuleInstalled` reads it and the
/// bundler sets it on submission.
pub fn installing_client(chain_id: u64, installed: Arc<AtomicBool>) -> TransactionClient {
	let mut public = MockPublicClientInterface::new();
	public
		.expect_get_code()
		.returning(|_| Box::pin(async { Ok(kernel::delegation_designator(KERNEL)) }));
	let read_flag = installed.clone();
	public.expect_call().returning(move |to, data| {
		let response = if to == ENTRY_POINT {
			U256::ZERO.abi_encode()
		} else {
			assert!(data.starts_with(&IKernel::isModuleInstalledCall::SELECTOR));
			read_flag.load(Ordering::SeqCst).abi_encode()
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

	let mut paymaster = MockPaymasterInterface::new();
	paymaster
		.expect_sponsor_user_operation()
		.returning(|_, _| Box::pin(async { Ok(sponsorship()) }));

	let mut bundler = MockBundlerInterface::new();
	bundler.expect_send_user_operation().returning(move |_, _| {
		installed.store(true, Ordering::SeqCst);
		Box::pin(async { Ok(B256::repeat_byte(0xab)) })
	});
	bundler
		.expect_get_user_operation_receipt()
		.returning(|hash| Box::pin(async move { Ok(Some(receipt(hash))) }));

	client_with(chain_id, public, bundler, paymaster)
}

/// Client whose chain RPC is unreachable.
pub fn unreachable_client(chain_id: u64) -> TransactionClient {
	let mut public = MockPublicClientInterface::new();
	public.expect_get_code().returning(|_| {
		Box::pin(async { Err(DeliveryError::Network("connection refused".to_string())) })
	});
	client_with(
		chain_id,
		public,
		MockBundlerInterface::new(),
		MockPaymasterInterface::new(),
	)
}

pub fn sponsorship() -> SponsorshipData {
	SponsorshipData {
		paymaster: Address::with_last_byte(0x99),
		paymaster_data: Bytes::from_static(&[1, 2]),
		paymaster_verification_gas_limit: U256::from(30_000),
		paymaster_post_op_gas_limit: U256::from(1),
		call_gas_limit: Some(U256::from(50_000)),
		verification_gas_limit: Some(U256::from(60_000)),
		pre_verification_gas: Some(U256::from(70_000)),
		max_fee_per_gas: None,
		max_priority_fee_per_gas: None,
	}
}

pub fn receipt(user_op_hash: B256) -> UserOperationReceipt {
	UserOperationReceipt {
		user_op_hash,
		sender: None,
		success: true,
		reason: None,
		actual_gas_cost: None,
		receipt: BundleReceipt {
			transaction_hash: B256::repeat_byte(0xcd),
			block_number: Some(U64::from(9)),
		},
	}
}
