//! One provider's composed wallet stack.
//!
//! The context owns the signed-in signer, the Kernel account built for it on
//! each chain, the session account and the intent client. Accounts are built
//! lazily on first use; a built pair is shared as-is and never modified.

use crate::action::ActionTracker;
use crate::{WalletError, WalletServices};
use alloy_primitives::{Address, B256, U256};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use wallet_account::{
	create_signer, CustodialSessionConfig, CustodialSigner, HostedFlavor, HostedSessionConfig,
	HostedSessionSigner, LocalSigner, SignerInterface, SignerProvider, ZERODEV_CONNECTOR,
};
use wallet_delivery::{poll_until, PollOutcome, PollPolicy};
use wallet_intent::{install_order, IntentClient, IntentModules};
use wallet_session::{erc20_transfer, CallPolicy, SessionAccount, SessionKeyManager, SessionModules};
use wallet_smart_account::{
	KernelContracts, SmartAccountBuilder, SmartAccountError, TransactionClient,
};
use wallet_types::{
	CabBalance, Call, EmbeddedWallet, IntentOutcome, IntentRequest, ProviderKind, StorageKey,
	TokenConfig,
};

/// Storage id of the local provider's private key.
const LOCAL_KEY_ID: &str = "private_key";

/// Session credentials handed to `login`.
///
/// Hosted providers expect an access token, the custodial provider a
/// session token. The local provider ignores them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
	#[serde(default)]
	pub token: Option<String>,
}

/// Signer and accounts of the signed-in wallet.
struct SignedIn {
	signer: Arc<dyn SignerInterface>,
	wallet: EmbeddedWallet,
	accounts: RwLock<HashMap<u64, TransactionClient>>,
}

/// Everything the application can do with one provider.
pub struct ProviderContext {
	provider: ProviderKind,
	services: WalletServices,
	session: RwLock<Option<Arc<SignedIn>>>,
	session_account: RwLock<Option<Arc<SessionAccount>>>,
	intent: RwLock<Option<IntentClient>>,
	actions: ActionTracker,
}

impl ProviderContext {
	pub fn new(provider: ProviderKind, services: WalletServices) -> Self {
		Self {
			provider,
			services,
			session: RwLock::new(None),
			session_account: RwLock::new(None),
			intent: RwLock::new(None),
			actions: ActionTracker::new(),
		}
	}

	pub fn provider(&self) -> ProviderKind {
		self.provider
	}

	pub fn actions(&self) -> &ActionTracker {
		&self.actions
	}

	/// Root validator every account is built with.
	pub fn ecdsa_validator(&self) -> Address {
		self.services.config.contracts.ecdsa_validator
	}

	/// The signed-in wallet, `None` before login.
	pub async fn embedded_wallet(&self) -> Option<EmbeddedWallet> {
		self.session
			.read()
			.await
			.as_ref()
			.map(|session| session.wallet.clone())
	}

	/// Signs in with the provider's back end.
	///
	/// The local provider reloads its persisted key, falls back to a key
	/// configured under `providers.local`, and generates one otherwise.
	pub async fn login(&self, credentials: &Credentials) -> Result<EmbeddedWallet, WalletError> {
		let providers = &self.services.config.providers;
		let signer = match self.provider {
			ProviderKind::Local => self.local_signer().await?,
			ProviderKind::Privy | ProviderKind::Dynamic => {
				let (config, flavor) = match self.provider {
					ProviderKind::Privy => (providers.privy.as_ref(), HostedFlavor::Privy),
					_ => {
						let config = providers.dynamic.as_ref();
						let required_connector = config
							.and_then(|c| c.required_connector.clone())
							.unwrap_or_else(|| ZERODEV_CONNECTOR.to_string());
						(config, HostedFlavor::Dynamic { required_connector })
					},
				};
				let config = config.ok_or_else(|| {
					WalletError::PrerequisiteMissing(format!(
						"{} provider configuration",
						self.provider
					))
				})?;
				let access_token = credentials.token.clone().ok_or_else(|| {
					WalletError::PrerequisiteMissing(format!("{} access token", self.provider))
				})?;
				SignerProvider::HostedSession(
					HostedSessionSigner::connect(HostedSessionConfig {
						endpoint: config.endpoint.clone(),
						access_token,
						flavor,
					})
					.await?,
				)
			},
			ProviderKind::Turnkey => {
				let config = providers.turnkey.as_ref().ok_or_else(|| {
					WalletError::PrerequisiteMissing("turnkey provider configuration".into())
				})?;
				SignerProvider::CustodialIframe(
					CustodialSigner::connect(CustodialSessionConfig {
						api_base_url: config.api_base_url.clone(),
						organization_id: config.organization_id.clone(),
						session_token: credentials.token.clone(),
					})
					.await?,
				)
			},
		};

		Ok(self.attach(signer).await)
	}

	/// Generates and persists a fresh local key, replacing any stored one.
	pub async fn create_account(&self) -> Result<EmbeddedWallet, WalletError> {
		if self.provider != ProviderKind::Local {
			return Err(WalletError::Unsupported(format!(
				"{} accounts are created by the provider",
				self.provider
			)));
		}
		let signer = LocalSigner::generate();
		self.services
			.storage
			.store(StorageKey::LocalAccount, LOCAL_KEY_ID, &signer.private_key_hex())
			.await?;
		tracing::info!(address = %SignerInterface::address(&signer), "Created local account");
		Ok(self.attach(SignerProvider::Local(signer)).await)
	}

	async fn local_signer(&self) -> Result<SignerProvider, WalletError> {
		let storage = &self.services.storage;
		if let Some(key) = storage
			.retrieve_optional::<String>(StorageKey::LocalAccount, LOCAL_KEY_ID)
			.await?
		{
			return Ok(SignerProvider::Local(LocalSigner::new(&key)?));
		}
		if let Some(table) = &self.services.config.providers.local {
			return Ok(create_signer("local", table)?);
		}

		let signer = LocalSigner::generate();
		storage
			.store(StorageKey::LocalAccount, LOCAL_KEY_ID, &signer.private_key_hex())
			.await?;
		tracing::info!(address = %SignerInterface::address(&signer), "Generated local account");
		Ok(SignerProvider::Local(signer))
	}

	/// Replaces the signed-in session and drops everything built on the old one.
	async fn attach(&self, signer: SignerProvider) -> EmbeddedWallet {
		let wallet = signer.embedded_wallet(self.provider);
		let session = Arc::new(SignedIn {
			signer: Arc::new(signer),
			wallet: wallet.clone(),
			accounts: RwLock::new(HashMap::new()),
		});

		*self.session.write().await = Some(session);
		*self.session_account.write().await = None;
		*self.intent.write().await = None;

		tracing::info!(provider = %self.provider, address = %wallet.address, "Signed in");
		wallet
	}

	async fn signed_in(&self) -> Result<Arc<SignedIn>, WalletError> {
		self.session
			.read()
			.await
			.clone()
			.ok_or_else(|| WalletError::PrerequisiteMissing("signed-in wallet".into()))
	}

	/// Transaction client of the root account on `chain_id`, built on first use.
	pub async fn account_client(&self, chain_id: u64) -> Result<TransactionClient, WalletError> {
		let session = self.signed_in().await?;
		if let Some(client) = session.accounts.read().await.get(&chain_id) {
			return Ok(client.clone());
		}

		let config = &self.services.config;
		let clients = self.services.delivery.clients(chain_id)?;
		let (_, client) = SmartAccountBuilder::new(
			chain_id,
			KernelContracts::from(&config.contracts),
			PollPolicy::from(&config.polling.receipts),
		)
		.signer(session.signer.clone())
		.clients(clients)
		.build()
		.await?;

		// A concurrent build may have finished first; the first stored pair wins.
		let mut accounts = session.accounts.write().await;
		Ok(accounts.entry(chain_id).or_insert(client).clone())
	}

	/// Whether the root account on `chain_id` is delegated to the Kernel.
	///
	/// `false` while nobody is signed in.
	pub async fn is_deployed(&self, chain_id: u64) -> Result<bool, WalletError> {
		if self.session.read().await.is_none() {
			return Ok(false);
		}
		let client = self.account_client(chain_id).await?;
		Ok(client.account().is_deployed().await?)
	}

	/// Polls until the account on `chain_id` is deployed; returns the attempt count.
	pub async fn wait_for_deployment(&self, chain_id: u64) -> Result<u32, WalletError> {
		let client = self.account_client(chain_id).await?;
		let account = client.account();
		let policy = PollPolicy::from(&self.services.config.polling.deployment);

		let outcome = poll_until(&policy, |_| async move {
			Ok::<_, SmartAccountError>(account.is_deployed().await?.then_some(()))
		})
		.await?;

		match outcome {
			PollOutcome::Ready { attempts, .. } => {
				tracing::info!(chain_id, attempts, "Account deployed");
				Ok(attempts)
			},
			PollOutcome::Inconclusive { attempts } => {
				Err(SmartAccountError::Inconclusive { attempts }.into())
			},
		}
	}

	pub async fn send_transaction(
		&self,
		chain_id: u64,
		calls: &[Call],
	) -> Result<B256, WalletError> {
		let client = self.account_client(chain_id).await?;
		Ok(client.send_transaction(calls).await?)
	}

	pub async fn send_user_operation(
		&self,
		chain_id: u64,
		calls: &[Call],
	) -> Result<B256, WalletError> {
		let client = self.account_client(chain_id).await?;
		Ok(client.send_user_operation(calls).await?)
	}

	/// Explorer link for a transaction on `chain_id`.
	pub fn explorer_tx_url(&self, chain_id: u64, hash: &B256) -> Option<String> {
		self.services
			.config
			.chain(chain_id)
			.and_then(|chain| chain.explorer_tx_url(&hash.to_string()))
	}

	fn session_token(&self, chain_id: u64) -> Result<TokenConfig, WalletError> {
		let session = self.services.config.session.as_ref().ok_or_else(|| {
			WalletError::PrerequisiteMissing("session configuration".into())
		})?;
		self.services
			.config
			.chain(chain_id)
			.and_then(|chain| chain.token(&session.token_symbol))
			.cloned()
			.ok_or_else(|| {
				WalletError::PrerequisiteMissing(format!(
					"{} token on chain {}",
					session.token_symbol, chain_id
				))
			})
	}

	/// Session key limited to transfers of the configured token, restored
	/// from storage when one exists for this provider and wallet.
	pub async fn create_session_key(
		&self,
		chain_id: u64,
	) -> Result<Arc<SessionAccount>, WalletError> {
		let token = self.session_token(chain_id)?;
		let session_config = self.services.config.session.as_ref().ok_or_else(|| {
			WalletError::PrerequisiteMissing("session configuration".into())
		})?;
		let root = self.account_client(chain_id).await?;

		let policy = CallPolicy::token_transfer_limit(
			token.address,
			token.decimals,
			session_config.transfer_limit,
		);
		let manager = SessionKeyManager::new(
			self.services.storage.clone(),
			SessionModules::from(session_config),
		);
		let account = Arc::new(
			manager
				.create_session_key(self.provider, &root, policy)
				.await?,
		);

		*self.session_account.write().await = Some(account.clone());
		Ok(account)
	}

	pub async fn session_account(&self) -> Option<Arc<SessionAccount>> {
		self.session_account.read().await.clone()
	}

	/// Transfers `amount` base units of the session token to `recipient`
	/// through the session key.
	pub async fn send_via_session_key(
		&self,
		recipient: Address,
		amount: U256,
	) -> Result<B256, WalletError> {
		let account = self
			.session_account()
			.await
			.ok_or_else(|| WalletError::PrerequisiteMissing("session key".into()))?;
		let token = self.session_token(account.handle().chain_id())?;
		let call = erc20_transfer(token.address, recipient, amount);
		Ok(account.send_transaction(&[call]).await?)
	}

	pub async fn intent_client(&self) -> Option<IntentClient> {
		self.intent.read().await.clone()
	}

	/// Installs the intent executor on every intent chain and keeps the
	/// resulting client.
	pub async fn create_intent_client(&self) -> Result<IntentClient, WalletError> {
		let config = &self.services.config;
		let intent = config.intent.as_ref().ok_or_else(|| {
			WalletError::PrerequisiteMissing("intent configuration".into())
		})?;
		let service = self
			.services
			.intents
			.clone()
			.ok_or_else(|| WalletError::PrerequisiteMissing("intent service".into()))?;
		let executor = config.contracts.intent_executor.ok_or_else(|| {
			WalletError::PrerequisiteMissing("intent executor address".into())
		})?;

		let mut clients = BTreeMap::new();
		for chain_id in install_order(&intent.input_chains, intent.output_chain) {
			clients.insert(chain_id, self.account_client(chain_id).await?);
		}

		let client = IntentClient::connect(
			service,
			clients,
			&intent.input_chains,
			intent.output_chain,
			IntentModules {
				executor,
				validator: config.contracts.intent_validator,
			},
			PollPolicy::from(&config.polling.intents),
		)
		.await?;

		*self.intent.write().await = Some(client.clone());
		Ok(client)
	}

	pub async fn send_intent(&self, request: &IntentRequest) -> Result<IntentOutcome, WalletError> {
		let client = self
			.intent_client()
			.await
			.ok_or_else(|| WalletError::PrerequisiteMissing("intent client".into()))?;
		Ok(client.send_intent(request).await?)
	}

	/// Chain-abstracted balance over the intent chains.
	pub async fn get_cab(&self) -> Result<CabBalance, WalletError> {
		let client = self
			.intent_client()
			.await
			.ok_or_else(|| WalletError::PrerequisiteMissing("intent client".into()))?;
		let tickers = self
			.services
			.config
			.intent
			.as_ref()
			.map(|intent| intent.cab_tickers.clone())
			.unwrap_or_default();
		Ok(client.get_cab(client.chain_ids(), tickers).await?)
	}
}
