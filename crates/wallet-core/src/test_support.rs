//! Configuration and mock chains for provider context tests.

use crate::WalletServices;
use alloy_primitives::{address, Address, Bytes};
use alloy_sol_types::SolValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use wallet_config::Config;
use wallet_delivery::{
	ChainClients, DeliveryService, MockBundlerInterface, MockPaymasterInterface,
	MockPublicClientInterface,
};
use wallet_intent::MockIntentInterface;
use wallet_smart_account::kernel;
use wallet_storage::implementations::memory::MemoryStorage;
use wallet_storage::StorageService;

pub const KERNEL: Address = address!("d6CEDDe84be40893d153Be9d467CD6aD37875b28");

pub const CONFIG: &str = r#"
[app]
id = "aa-playground-test"
default_chain = 84532

[contracts]
kernel_implementation = "0xd6CEDDe84be40893d153Be9d467CD6aD37875b28"
ecdsa_validator = "0x845ADb2C711129d4f3966735eD98a9F09fC4cE57"

[polling.deployment]
interval_ms = 1000
max_attempts = 5

[networks.84532]
name = "Base Sepolia"
bundler_url = "https://bundler.example/84532"
paymaster_url = "https://paymaster.example/84532"
explorer_url = "https://sepolia.basescan.org"
[[networks.84532.rpc_urls]]
http = "https://sepolia.base.org"
[[networks.84532.tokens]]
address = "0xfe4e9a244dc5aa212a2e166b670ebccea112b099"
symbol = "ZDEV"
decimals = 6
"#;

pub fn config() -> Config {
	CONFIG.parse().unwrap()
}

/// `CONFIG` with an intent executor and Sepolia as the single input chain.
pub fn intent_config() -> Config {
	let text = CONFIG.replace(
		"[polling.deployment]",
		"intent_executor = \"0x8e3c2a2e9d3a4c1d6ba1de3b8c1f32c6f3a4e5b7\"\n\n[polling.deployment]",
	);
	format!(
		"{}{}",
		text,
		r#"
[networks.11155111]
name = "Sepolia"
bundler_url = "https://bundler.example/11155111"
paymaster_url = "https://paymaster.example/11155111"
[[networks.11155111.rpc_urls]]
http = "https://rpc.sepolia.org"

[intent]
service_url = "https://intents.example"
input_chains = [11155111]
output_chain = 84532
"#
	)
	.parse()
	.unwrap()
}

/// Code reads of one account; the account counts as delegated from read `from` on.
#[derive(Clone)]
pub struct DelegationSchedule {
	from: u32,
	reads: Arc<AtomicU32>,
}

impl DelegationSchedule {
	pub fn from_read(from: u32) -> Self {
		Self {
			from,
			reads: Arc::new(AtomicU32::new(0)),
		}
	}

	pub fn reads(&self) -> u32 {
		self.reads.load(Ordering::SeqCst)
	}

	fn public_client(&self) -> MockPublicClientInterface {
		let mut public = MockPublicClientInterface::new();
		let schedule = self.clone();
		public.expect_get_code().returning(move |_| {
			let read = schedule.reads.fetch_add(1, Ordering::SeqCst) + 1;
			let code = if read >= schedule.from {
				kernel::delegation_designator(KERNEL)
			} else {
				Bytes::new()
			};
			Box::pin(async move { Ok(code) })
		});
		public
			.expect_get_transaction_count()
			.returning(|_| Box::pin(async { Ok(0) }));
		public
	}
}

/// Delegated chain whose account already has every module installed.
fn installed_chain(chain_id: u64) -> ChainClients {
	let mut public = DelegationSchedule::from_read(1).public_client();
	public
		.expect_call()
		.returning(|_, _| Box::pin(async { Ok(Bytes::from(true.abi_encode())) }));
	ChainClients {
		chain_id,
		public: Arc::new(public),
		bundler: Arc::new(MockBundlerInterface::new()),
		paymaster: Arc::new(MockPaymasterInterface::new()),
	}
}

/// Services over both intent chains, with `intents` as the intent service.
pub fn intent_services(intents: MockIntentInterface) -> WalletServices {
	let chains = [11155111, 84532].map(|chain_id| (chain_id, installed_chain(chain_id)));
	WalletServices {
		config: Arc::new(intent_config()),
		storage: Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
		delivery: Arc::new(DeliveryService::new(HashMap::from(chains))),
		intents: Some(Arc::new(intents)),
	}
}

/// Services over a chain that never becomes delegated.
pub fn services() -> WalletServices {
	services_with(DelegationSchedule::from_read(u32::MAX))
}

/// Services whose single chain follows `schedule`.
pub fn services_with(schedule: DelegationSchedule) -> WalletServices {
	let chain = ChainClients {
		chain_id: 84532,
		public: Arc::new(schedule.public_client()),
		bundler: Arc::new(MockBundlerInterface::new()),
		paymaster: Arc::new(MockPaymasterInterface::new()),
	};

	WalletServices {
		config: Arc::new(config()),
		storage: Arc::new(StorageService::new(Box::new(MemoryStorage::new()))),
		delivery: Arc::new(DeliveryService::new(HashMap::from([(84532, chain)]))),
		intents: None,
	}
}
