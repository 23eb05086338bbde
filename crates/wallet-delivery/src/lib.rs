//! Remote service clients for the account-abstraction playground.
//!
//! Three collaborators are needed to move a user operation on chain: the
//! chain's public RPC (code, nonces, reads, fees), an ERC-4337 bundler and a
//! paymaster that sponsors gas. Each is a mockable trait with an alloy-backed
//! implementation. The crate also owns the bounded polling helper used by
//! every wait.

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use wallet_types::{
	ChainConfig, GasEstimate, NetworksConfig, SponsorshipData, UserOperation,
	UserOperationReceipt,
};

/// Re-export implementations
pub mod implementations {
	pub mod bundler;
	pub mod paymaster;
	pub mod public;
	mod rpc;
}

/// Bounded polling with backoff.
pub mod poll;

pub use poll::{poll_until, PollOutcome, PollPolicy};

/// Errors that can occur while talking to remote services.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The remote service understood the request and refused it.
	#[error("Rejected by remote service (code {code}): {message}")]
	Rejected { code: i64, message: String },
	/// A polling loop ran out of attempts.
	#[error("No result after {attempts} attempts")]
	Inconclusive { attempts: u32 },
	/// Local configuration does not describe the requested chain or service.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl DeliveryError {
	/// Whether the error is a remote refusal whose message contains `needle`.
	pub fn is_rejection_containing(&self, needle: &str) -> bool {
		matches!(self, DeliveryError::Rejected { message, .. } if message.to_lowercase().contains(&needle.to_lowercase()))
	}
}

/// EIP-1559 fee suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeEstimate {
	pub max_fee_per_gas: u128,
	pub max_priority_fee_per_gas: u128,
}

/// Read access to one chain.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PublicClientInterface: Send + Sync {
	/// Chain this client is bound to.
	fn chain_id(&self) -> u64;

	/// Deployed code at `address` (empty for plain EOAs).
	async fn get_code(&self, address: Address) -> Result<Bytes, DeliveryError>;

	/// Pending transaction count of `address`.
	async fn get_transaction_count(&self, address: Address) -> Result<u64, DeliveryError>;

	/// `eth_call` against the latest block.
	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError>;

	/// Current EIP-1559 fee suggestion.
	async fn estimate_fees(&self) -> Result<FeeEstimate, DeliveryError>;
}

/// ERC-4337 bundler.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait BundlerInterface: Send + Sync {
	/// Submits an operation, returning its hash.
	async fn send_user_operation(
		&self,
		op: &UserOperation,
		entry_point: Address,
	) -> Result<B256, DeliveryError>;

	/// Estimates gas limits for an operation carrying a dummy signature.
	async fn estimate_user_operation_gas(
		&self,
		op: &UserOperation,
		entry_point: Address,
	) -> Result<GasEstimate, DeliveryError>;

	/// Receipt of an operation, `None` while it is not yet included.
	async fn get_user_operation_receipt(
		&self,
		hash: B256,
	) -> Result<Option<UserOperationReceipt>, DeliveryError>;
}

/// Gas sponsorship service.
#[async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PaymasterInterface: Send + Sync {
	/// Requests sponsorship for an operation carrying a dummy signature.
	async fn sponsor_user_operation(
		&self,
		op: &UserOperation,
		entry_point: Address,
	) -> Result<SponsorshipData, DeliveryError>;
}

/// The three clients bound to one chain.
#[derive(Clone)]
pub struct ChainClients {
	pub chain_id: u64,
	pub public: Arc<dyn PublicClientInterface>,
	pub bundler: Arc<dyn BundlerInterface>,
	pub paymaster: Arc<dyn PaymasterInterface>,
}

impl ChainClients {
	/// Builds alloy-backed clients from a chain's configuration.
	pub fn from_config(chain_id: u64, chain: &ChainConfig) -> Result<Self, DeliveryError> {
		use implementations::{
			bundler::RpcBundlerClient, paymaster::RpcPaymasterClient, public::AlloyPublicClient,
		};

		let rpc_url = chain.get_http_url().ok_or_else(|| {
			DeliveryError::Configuration(format!(
				"No HTTP RPC URL configured for network {}",
				chain_id
			))
		})?;

		Ok(Self {
			chain_id,
			public: Arc::new(AlloyPublicClient::new(chain_id, rpc_url)?),
			bundler: Arc::new(RpcBundlerClient::new(&chain.bundler_url)?),
			paymaster: Arc::new(RpcPaymasterClient::new(chain_id, &chain.paymaster_url)?),
		})
	}
}

/// Clients for every configured chain.
pub struct DeliveryService {
	clients: HashMap<u64, ChainClients>,
}

impl DeliveryService {
	/// Creates a service from prebuilt clients.
	pub fn new(clients: HashMap<u64, ChainClients>) -> Self {
		Self { clients }
	}

	/// Builds clients for every network in the configuration.
	pub fn from_networks(networks: &NetworksConfig) -> Result<Self, DeliveryError> {
		let clients = networks
			.iter()
			.map(|(chain_id, chain)| Ok((*chain_id, ChainClients::from_config(*chain_id, chain)?)))
			.collect::<Result<HashMap<_, _>, DeliveryError>>()?;
		Ok(Self { clients })
	}

	/// Clients for `chain_id`.
	pub fn clients(&self, chain_id: u64) -> Result<&ChainClients, DeliveryError> {
		self.clients.get(&chain_id).ok_or_else(|| {
			DeliveryError::Configuration(format!("No clients configured for chain ID {}", chain_id))
		})
	}

	/// Configured chain ids, ascending.
	pub fn chain_ids(&self) -> Vec<u64> {
		let mut ids: Vec<u64> = self.clients.keys().copied().collect();
		ids.sort_unstable();
		ids
	}
}
