//! Custodial signing API signer (Turnkey-like back end).
//!
//! The custodial service only signs raw 32-byte digests. Message, typed-data
//! and authorization digests are computed locally and submitted through
//! `submit/sign_raw_payload`; the returned `{r, s, v}` triple is assembled
//! into a signature.

use crate::{AccountError, SignerInterface};
use alloy_consensus::TxLegacy;
use alloy_dyn_abi::TypedData;
use alloy_primitives::{eip191_hash_message, Address, Bytes, Signature, B256, U256};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use wallet_types::{authorization_signing_hash, AuthorizationGrant};

const ETHEREUM_ADDRESS_FORMAT: &str = "ADDRESS_FORMAT_ETHEREUM";

/// Credentials for one custodial session.
#[derive(Debug, Clone)]
pub struct CustodialSessionConfig {
	pub api_base_url: String,
	pub organization_id: String,
	/// Session token issued after the user authenticated in the provider's iframe.
	pub session_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WhoAmI {
	#[serde(default)]
	username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletsResponse {
	#[serde(default)]
	wallets: Vec<WalletSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletSummary {
	wallet_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletAccountsResponse {
	#[serde(default)]
	accounts: Vec<WalletAccount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletAccount {
	address: Address,
	address_format: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRawPayloadRequest<'a> {
	#[serde(rename = "type")]
	activity_type: &'static str,
	timestamp_ms: String,
	organization_id: &'a str,
	parameters: SignRawPayloadParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRawPayloadParameters {
	sign_with: Address,
	payload: String,
	encoding: &'static str,
	hash_function: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityResponse {
	activity: Activity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Activity {
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	result: Option<ActivityResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityResult {
	sign_raw_payload_result: RawSignature,
}

#[derive(Debug, Deserialize)]
struct RawSignature {
	r: String,
	s: String,
	v: String,
}

impl RawSignature {
	fn to_signature(&self) -> Result<Signature, AccountError> {
		let parse = |field: &str, value: &str| {
			U256::from_str_radix(value.trim_start_matches("0x"), 16).map_err(|e| {
				AccountError::SigningFailed(format!("Malformed signature {}: {}", field, e))
			})
		};
		let r = parse("r", &self.r)?;
		let s = parse("s", &self.s)?;
		let v = u64::from_str_radix(self.v.trim_start_matches("0x"), 16)
			.map_err(|e| AccountError::SigningFailed(format!("Malformed signature v: {}", e)))?;
		let y_parity = match v {
			0 | 27 => false,
			1 | 28 => true,
			other => {
				return Err(AccountError::SigningFailed(format!(
					"Unexpected recovery id {}",
					other
				)))
			},
		};
		Ok(Signature::new(r, s, y_parity))
	}
}

/// Signer backed by a custodial signing API.
#[derive(Debug)]
pub struct CustodialSigner {
	client: Client,
	api_base_url: String,
	organization_id: String,
	session_token: String,
	address: Address,
	user: Option<String>,
}

impl CustodialSigner {
	/// Opens the session and selects the first Ethereum account of the first wallet.
	pub async fn connect(config: CustodialSessionConfig) -> Result<Self, AccountError> {
		let session_token = config
			.session_token
			.filter(|t| !t.trim().is_empty())
			.ok_or_else(|| AccountError::NoSession("missing session token".to_string()))?;

		let client = Client::builder()
			.timeout(Duration::from_secs(30))
			.build()
			.map_err(|e| AccountError::Remote(format!("Failed to build HTTP client: {}", e)))?;

		let mut signer = Self {
			client,
			api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
			organization_id: config.organization_id,
			session_token,
			address: Address::ZERO,
			user: None,
		};

		let org = json!({"organizationId": signer.organization_id});
		let whoami: WhoAmI = signer.post("query/whoami", &org).await?;
		let wallets: WalletsResponse = signer.post("query/get_wallets", &org).await?;
		let wallet = wallets
			.wallets
			.first()
			.ok_or_else(|| AccountError::NoSession("organization has no wallets".to_string()))?;

		let accounts: WalletAccountsResponse = signer
			.post(
				"query/list_wallet_accounts",
				&json!({"organizationId": signer.organization_id, "walletId": wallet.wallet_id}),
			)
			.await?;
		let account = accounts
			.accounts
			.iter()
			.find(|a| a.address_format == ETHEREUM_ADDRESS_FORMAT)
			.ok_or_else(|| {
				AccountError::NoSession("wallet has no Ethereum account".to_string())
			})?;

		signer.address = account.address;
		signer.user = whoami.username;
		tracing::info!(address = %signer.address, "Connected custodial signing session");
		Ok(signer)
	}

	/// User name reported by the provider.
	pub fn user(&self) -> Option<&str> {
		self.user.as_deref()
	}

	async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
		&self,
		path: &str,
		body: &B,
	) -> Result<R, AccountError> {
		let url = format!("{}/public/v1/{}", self.api_base_url, path);
		let response = self
			.client
			.post(&url)
			.bearer_auth(&self.session_token)
			.json(body)
			.send()
			.await
			.map_err(|e| AccountError::Remote(format!("Failed to call {}: {}", path, e)))?;

		let status = response.status();
		if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
			return Err(AccountError::NoSession(format!(
				"session expired or rejected ({})",
				status
			)));
		}
		if !status.is_success() {
			let text = response.text().await.unwrap_or_default();
			return Err(AccountError::Remote(format!(
				"{} failed with status {}: {}",
				path, status, text
			)));
		}

		response
			.json()
			.await
			.map_err(|e| AccountError::Remote(format!("Failed to parse {} response: {}", path, e)))
	}

	/// Signs a raw digest through the custodial API.
	pub async fn sign_digest(&self, digest: B256) -> Result<Signature, AccountError> {
		let timestamp_ms = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_millis())
			.unwrap_or_default()
			.to_string();
		let request = SignRawPayloadRequest {
			activity_type: "ACTIVITY_TYPE_SIGN_RAW_PAYLOAD_V2",
			timestamp_ms,
			organization_id: &self.organization_id,
			parameters: SignRawPayloadParameters {
				sign_with: self.address,
				payload: hex::encode(digest),
				encoding: "PAYLOAD_ENCODING_HEXADECIMAL",
				hash_function: "HASH_FUNCTION_NO_OP",
			},
		};

		let response: ActivityResponse = self.post("submit/sign_raw_payload", &request).await?;
		let result = response.activity.result.ok_or_else(|| {
			AccountError::SigningFailed(format!(
				"Signing activity did not complete (status {})",
				response.activity.status.as_deref().unwrap_or("unknown")
			))
		})?;
		result.sign_raw_payload_result.to_signature()
	}
}

#[async_trait]
impl SignerInterface for CustodialSigner {
	fn address(&self) -> Address {
		self.address
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		self.sign_digest(eip191_hash_message(message)).await
	}

	async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature, AccountError> {
		let digest = typed_data
			.eip712_signing_hash()
			.map_err(|e| AccountError::SigningFailed(format!("Invalid typed data: {}", e)))?;
		self.sign_digest(digest).await
	}

	async fn sign_authorization(
		&self,
		delegate: Address,
		chain_id: u64,
		nonce: u64,
	) -> Result<AuthorizationGrant, AccountError> {
		let signature = self
			.sign_digest(authorization_signing_hash(delegate, chain_id, nonce))
			.await?;
		Ok(AuthorizationGrant {
			chain_id,
			nonce,
			delegate,
			signature,
		})
	}

	async fn sign_transaction(&self, _tx: TxLegacy) -> Result<Bytes, AccountError> {
		Err(AccountError::UnsupportedOperation(
			"custodial wallets only sign for smart accounts".to_string(),
		))
	}
}
