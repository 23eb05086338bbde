//! Smart account construction.

use crate::account::{AccountHandle, AccountParts, ValidatorBinding};
use crate::client::TransactionClient;
use crate::{kernel, KernelContracts, SmartAccountError};
use alloy_primitives::Address;
use std::sync::Arc;
use tracing::instrument;
use wallet_account::SignerInterface;
use wallet_delivery::{
	BundlerInterface, ChainClients, PaymasterInterface, PollPolicy, PublicClientInterface,
};
use wallet_types::{truncate_id, AuthorizationGrant};

/// Builds an [`AccountHandle`] and its [`TransactionClient`] for one chain.
pub struct SmartAccountBuilder {
	chain_id: u64,
	contracts: KernelContracts,
	signer: Option<Arc<dyn SignerInterface>>,
	public: Option<Arc<dyn PublicClientInterface>>,
	bundler: Option<Arc<dyn BundlerInterface>>,
	paymaster: Option<Arc<dyn PaymasterInterface>>,
	reattach: Option<Address>,
	authorization: Option<AuthorizationGrant>,
	receipt_policy: PollPolicy,
}

impl SmartAccountBuilder {
	pub fn new(chain_id: u64, contracts: KernelContracts, receipt_policy: PollPolicy) -> Self {
		Self {
			chain_id,
			contracts,
			signer: None,
			public: None,
			bundler: None,
			paymaster: None,
			reattach: None,
			authorization: None,
			receipt_policy,
		}
	}

	pub fn signer(mut self, signer: Arc<dyn SignerInterface>) -> Self {
		self.signer = Some(signer);
		self
	}

	pub fn public_client(mut self, public: Arc<dyn PublicClientInterface>) -> Self {
		self.public = Some(public);
		self
	}

	pub fn bundler(mut self, bundler: Arc<dyn BundlerInterface>) -> Self {
		self.bundler = Some(bundler);
		self
	}

	pub fn paymaster(mut self, paymaster: Arc<dyn PaymasterInterface>) -> Self {
		self.paymaster = Some(paymaster);
		self
	}

	/// Sets all three remote clients of a chain.
	pub fn clients(self, clients: &ChainClients) -> Self {
		self.public_client(clients.public.clone())
			.bundler(clients.bundler.clone())
			.paymaster(clients.paymaster.clone())
	}

	/// Attaches to an account known to exist; no authorization is derived.
	pub fn reattach(mut self, address: Address) -> Self {
		self.reattach = Some(address);
		self
	}

	/// Uses an authorization obtained earlier instead of asking the signer.
	pub fn authorization(mut self, grant: AuthorizationGrant) -> Self {
		self.authorization = Some(grant);
		self
	}

	#[instrument(skip_all, fields(chain_id = self.chain_id))]
	pub async fn build(self) -> Result<(AccountHandle, TransactionClient), SmartAccountError> {
		let public = self
			.public
			.ok_or_else(|| SmartAccountError::PrerequisiteMissing("public client".into()))?;
		let paymaster = self
			.paymaster
			.ok_or_else(|| SmartAccountError::PrerequisiteMissing("paymaster client".into()))?;
		let bundler = self
			.bundler
			.ok_or_else(|| SmartAccountError::PrerequisiteMissing("bundler client".into()))?;
		let signer = self
			.signer
			.ok_or_else(|| SmartAccountError::PrerequisiteMissing("signer".into()))?;

		let (address, authorization) = match self.reattach {
			Some(address) => {
				tracing::debug!(address = %address, "Reattaching to existing account");
				(address, self.authorization)
			},
			None => {
				let address = signer.address();
				let authorization = match self.authorization {
					Some(grant) => Some(grant),
					None => {
						Self::derive_authorization(
							self.chain_id,
							self.contracts.kernel_implementation,
							address,
							signer.as_ref(),
							public.as_ref(),
						)
						.await?
					},
				};
				(address, authorization)
			},
		};

		let account = AccountHandle::new(AccountParts {
			address,
			chain_id: self.chain_id,
			entry_point: self.contracts.entry_point,
			kernel_implementation: self.contracts.kernel_implementation,
			validator: ValidatorBinding::Sudo {
				ecdsa_validator: self.contracts.ecdsa_validator,
			},
			signer,
			authorization,
			public_client: public,
		});

		tracing::info!(
			address = %account.address(),
			instance = %truncate_id(&account.instance_id().to_string()),
			has_authorization = account.authorization().is_some(),
			"Built smart account"
		);

		let client =
			TransactionClient::new(account.clone(), bundler, paymaster, self.receipt_policy);
		Ok((account, client))
	}

	/// Signs a delegation to the Kernel unless the EOA already delegates to it.
	async fn derive_authorization(
		chain_id: u64,
		implementation: Address,
		address: Address,
		signer: &dyn SignerInterface,
		public: &dyn PublicClientInterface,
	) -> Result<Option<AuthorizationGrant>, SmartAccountError> {
		let code = public.get_code(address).await?;
		if kernel::is_delegated_to(&code, implementation) {
			tracing::debug!(address = %address, "Account already delegated, skipping authorization");
			return Ok(None);
		}

		let nonce = public.get_transaction_count(address).await?;
		let grant = signer
			.sign_authorization(implementation, chain_id, nonce)
			.await?;
		tracing::debug!(address = %address, nonce, "Signed EIP-7702 authorization");
		Ok(Some(grant))
	}
}
