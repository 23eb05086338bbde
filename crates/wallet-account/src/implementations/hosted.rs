//! Hosted wallet session signer (Privy-like and Dynamic-like back ends).
//!
//! The provider's embedded wallet is reached through a JSON-RPC endpoint
//! authenticated with the session's bearer access token. Keys never leave
//! the provider; every signature is produced remotely.

use crate::{AccountError, SignerInterface, ZERODEV_CONNECTOR};
use alloy_consensus::TxLegacy;
use alloy_dyn_abi::TypedData;
use alloy_primitives::{Address, Bytes, Signature, U64};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use wallet_types::{AuthorizationGrant, JsonRpcRequest, JsonRpcResponse};

/// Which hosted back end the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostedFlavor {
	/// Uses the wallet whose client type is `privy`.
	Privy,
	/// Uses the primary wallet, which must come from `required_connector`.
	Dynamic { required_connector: String },
}

impl HostedFlavor {
	pub fn dynamic() -> Self {
		Self::Dynamic {
			required_connector: ZERODEV_CONNECTOR.to_string(),
		}
	}
}

/// Credentials for one hosted wallet session.
#[derive(Debug, Clone)]
pub struct HostedSessionConfig {
	pub endpoint: String,
	pub access_token: String,
	pub flavor: HostedFlavor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbeddedWalletsResult {
	#[serde(default)]
	user: Option<HostedUser>,
	#[serde(default)]
	wallets: Vec<HostedWallet>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostedUser {
	id: String,
	#[serde(default)]
	email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostedWallet {
	address: Address,
	#[serde(default)]
	wallet_client_type: Option<String>,
	#[serde(default)]
	connector: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthorizationParams {
	contract_address: Address,
	chain_id: U64,
	nonce: U64,
}

/// Signer backed by a hosted embedded wallet.
#[derive(Debug)]
pub struct HostedSessionSigner {
	client: Client,
	endpoint: String,
	access_token: String,
	address: Address,
	user: Option<String>,
	next_id: AtomicU64,
}

impl HostedSessionSigner {
	/// Opens the session and selects the wallet to sign with.
	///
	/// Fails with `NoSession` when the token is missing or rejected and with
	/// `UnsupportedConnector` when a Dynamic wallet comes from a connector
	/// that cannot drive a smart account.
	pub async fn connect(config: HostedSessionConfig) -> Result<Self, AccountError> {
		if config.access_token.trim().is_empty() {
			return Err(AccountError::NoSession("missing access token".to_string()));
		}

		let client = Client::builder()
			.timeout(Duration::from_secs(30))
			.build()
			.map_err(|e| AccountError::Remote(format!("Failed to build HTTP client: {}", e)))?;

		let mut signer = Self {
			client,
			endpoint: config.endpoint,
			access_token: config.access_token,
			address: Address::ZERO,
			user: None,
			next_id: AtomicU64::new(1),
		};

		let result: EmbeddedWalletsResult = signer
			.rpc("wallet_getEmbeddedWallets", json!([]))
			.await?;
		let wallet = select_wallet(&config.flavor, &result.wallets)?;

		signer.address = wallet.address;
		signer.user = result.user.map(|user| match config.flavor {
			HostedFlavor::Privy => user.email.unwrap_or(user.id),
			HostedFlavor::Dynamic { .. } => user.email.unwrap_or_default(),
		});

		tracing::info!(address = %signer.address, "Connected hosted wallet session");
		Ok(signer)
	}

	/// User label reported by the provider.
	pub fn user(&self) -> Option<&str> {
		self.user.as_deref()
	}

	async fn rpc<R: DeserializeOwned>(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<R, AccountError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let response = self
			.client
			.post(&self.endpoint)
			.bearer_auth(&self.access_token)
			.json(&JsonRpcRequest::new(id, method, params))
			.send()
			.await
			.map_err(|e| AccountError::Remote(format!("Failed to call {}: {}", method, e)))?;

		match response.status() {
			StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
				return Err(AccountError::NoSession(format!(
					"session rejected by provider ({})",
					response.status()
				)));
			},
			status if !status.is_success() => {
				let text = response.text().await.unwrap_or_default();
				return Err(AccountError::Remote(format!(
					"{} failed with status {}: {}",
					method, status, text
				)));
			},
			_ => {},
		}

		let body: JsonRpcResponse<R> = response
			.json()
			.await
			.map_err(|e| {
				AccountError::Remote(format!("Failed to parse {} response: {}", method, e))
			})?;
		body.into_result()
			.map_err(|e| AccountError::SigningFailed(format!("{} rejected: {}", method, e)))
	}

	async fn rpc_signature(
		&self,
		method: &str,
		params: serde_json::Value,
	) -> Result<Signature, AccountError> {
		let raw: Bytes = self.rpc(method, params).await?;
		Signature::from_raw(&raw)
			.map_err(|e| AccountError::SigningFailed(format!("Malformed signature: {}", e)))
	}
}

fn select_wallet<'a>(
	flavor: &HostedFlavor,
	wallets: &'a [HostedWallet],
) -> Result<&'a HostedWallet, AccountError> {
	match flavor {
		HostedFlavor::Privy => wallets
			.iter()
			.find(|w| w.wallet_client_type.as_deref() == Some("privy"))
			.ok_or_else(|| AccountError::NoSession("no embedded privy wallet".to_string())),
		HostedFlavor::Dynamic { required_connector } => {
			let wallet = wallets
				.first()
				.ok_or_else(|| AccountError::NoSession("no primary wallet".to_string()))?;
			let connector = wallet.connector.as_deref().unwrap_or("unknown");
			if !connector.eq_ignore_ascii_case(required_connector) {
				return Err(AccountError::UnsupportedConnector(connector.to_string()));
			}
			Ok(wallet)
		},
	}
}

#[async_trait]
impl SignerInterface for HostedSessionSigner {
	fn address(&self) -> Address {
		self.address
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		let message = Bytes::copy_from_slice(message);
		self.rpc_signature("personal_sign", json!([message, self.address]))
			.await
	}

	async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature, AccountError> {
		self.rpc_signature("eth_signTypedData_v4", json!([self.address, typed_data]))
			.await
	}

	async fn sign_authorization(
		&self,
		delegate: Address,
		chain_id: u64,
		nonce: u64,
	) -> Result<AuthorizationGrant, AccountError> {
		let params = AuthorizationParams {
			contract_address: delegate,
			chain_id: U64::from(chain_id),
			nonce: U64::from(nonce),
		};
		let signature = self
			.rpc_signature("wallet_signAuthorization", json!([params]))
			.await?;

		let grant = AuthorizationGrant {
			chain_id,
			nonce,
			delegate,
			signature,
		};
		if grant.authority() != Some(self.address) {
			return Err(AccountError::SigningFailed(
				"authorization signature does not recover to the session wallet".to_string(),
			));
		}
		Ok(grant)
	}

	async fn sign_transaction(&self, _tx: TxLegacy) -> Result<Bytes, AccountError> {
		Err(AccountError::UnsupportedOperation(
			"hosted wallets only sign for smart accounts".to_string(),
		))
	}
}
