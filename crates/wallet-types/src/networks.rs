//! Network configuration types for the supported chains.
//!
//! Each chain the playground can target is described once: its RPC endpoints,
//! the bundler and paymaster it submits user operations through, an optional
//! block explorer and the tokens the demo flows refer to.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// RPC endpoint supporting HTTP and/or WebSocket transport.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RpcEndpoint {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub http: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ws: Option<String>,
}

impl RpcEndpoint {
	/// Creates a new RPC endpoint with HTTP URL only.
	pub fn http_only(url: impl Into<String>) -> Self {
		Self {
			http: Some(url.into()),
			ws: None,
		}
	}
}

/// A token the playground interacts with on a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TokenConfig {
	pub address: Address,
	pub symbol: String,
	pub decimals: u8,
}

/// Static description of one supported chain.
///
/// No logic lives here beyond lookups; everything above this layer consumes it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Human readable name, e.g. "Base Sepolia".
	pub name: String,
	/// Chain RPC endpoints, first HTTP entry wins.
	pub rpc_urls: Vec<RpcEndpoint>,
	/// ERC-4337 bundler endpoint.
	pub bundler_url: String,
	/// Paymaster endpoint used for gas sponsorship.
	pub paymaster_url: String,
	/// Block explorer base URL without trailing slash.
	#[serde(default)]
	pub explorer_url: Option<String>,
	/// Tokens used by the demo flows on this chain.
	#[serde(default)]
	pub tokens: Vec<TokenConfig>,
}

impl ChainConfig {
	/// Get the first available HTTP URL from the RPC endpoints.
	pub fn get_http_url(&self) -> Option<&str> {
		self.rpc_urls
			.iter()
			.find_map(|endpoint| endpoint.http.as_deref())
	}

	/// Looks up a token by its symbol (case-insensitive).
	pub fn token(&self, symbol: &str) -> Option<&TokenConfig> {
		self.tokens
			.iter()
			.find(|t| t.symbol.eq_ignore_ascii_case(symbol))
	}

	/// Explorer link for a transaction hash, if an explorer is configured.
	pub fn explorer_tx_url(&self, tx_hash: &str) -> Option<String> {
		self.explorer_url
			.as_ref()
			.map(|base| format!("{}/tx/{}", base.trim_end_matches('/'), tx_hash))
	}

	/// Explorer link for an address, if an explorer is configured.
	pub fn explorer_address_url(&self, address: &Address) -> Option<String> {
		self.explorer_url
			.as_ref()
			.map(|base| format!("{}/address/{}", base.trim_end_matches('/'), address))
	}
}

/// Chains keyed by chain id.
pub type NetworksConfig = HashMap<u64, ChainConfig>;

/// Deserializes a networks table whose keys are chain ids written as strings.
///
/// TOML table keys are always strings, so `[networks.84532]` arrives as
/// `"84532"` and is parsed into a `u64` here.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let raw: HashMap<String, ChainConfig> = HashMap::deserialize(deserializer)?;
	raw.into_iter()
		.map(|(key, value)| {
			key.parse::<u64>()
				.map(|chain_id| (chain_id, value))
				.map_err(|e| {
					serde::de::Error::custom(format!("Invalid chain id '{}': {}", key, e))
				})
		})
		.collect()
}
