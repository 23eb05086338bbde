//! Configuration module for the account-abstraction playground.
//!
//! This module provides structures and utilities for managing configuration.
//! It supports loading configuration from TOML files, resolves `${VAR}` and
//! `${VAR:-default}` environment references before parsing, and validates
//! the result so that every network, contract and polling bound the runtime
//! relies on is present and consistent.

use alloy_primitives::{address, Address};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use wallet_types::{deserialize_networks, ChainConfig, NetworksConfig};

/// Canonical EntryPoint v0.7 deployment.
pub const ENTRY_POINT_V07: Address = address!("0000000071727De22E5E9d8BAf0edAc6f37da032");

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Parse error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub app: AppConfig,
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	pub contracts: ContractsConfig,
	#[serde(default)]
	pub providers: ProvidersConfig,
	#[serde(default)]
	pub storage: StorageConfig,
	#[serde(default)]
	pub polling: PollingConfig,
	#[serde(default)]
	pub intent: Option<IntentConfig>,
	#[serde(default)]
	pub session: Option<SessionConfig>,
	#[serde(default)]
	pub api: ApiConfig,
}

/// Application identity and defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
	pub id: String,
	/// Provider selected at startup. Kept as a raw string: an unknown value
	/// surfaces as the invalid-provider state instead of a startup failure.
	#[serde(default = "default_provider")]
	pub default_provider: String,
	pub default_chain: u64,
}

fn default_provider() -> String {
	"local".to_string()
}

/// Addresses of the account-abstraction contracts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContractsConfig {
	#[serde(default = "default_entry_point")]
	pub entry_point: Address,
	/// Kernel implementation EOAs delegate to.
	pub kernel_implementation: Address,
	/// ECDSA validator used as the sudo validator.
	pub ecdsa_validator: Address,
	/// Executor module required for cross-chain intents.
	#[serde(default)]
	pub intent_executor: Option<Address>,
	/// Multi-chain ECDSA validator installed next to the intent executor.
	#[serde(default)]
	pub intent_validator: Option<Address>,
}

fn default_entry_point() -> Address {
	ENTRY_POINT_V07
}

/// Per-provider settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProvidersConfig {
	#[serde(default)]
	pub privy: Option<HostedProviderConfig>,
	#[serde(default)]
	pub dynamic: Option<HostedProviderConfig>,
	#[serde(default)]
	pub turnkey: Option<CustodialProviderConfig>,
	/// Raw table handed to the local signer factory.
	#[serde(default)]
	pub local: Option<toml::Value>,
}

/// Hosted wallet back end reached over JSON-RPC.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostedProviderConfig {
	pub endpoint: String,
	/// Connector name the session must report, if any.
	#[serde(default)]
	pub required_connector: Option<String>,
}

/// Custodial signing API reached over REST.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustodialProviderConfig {
	pub api_base_url: String,
	pub organization_id: String,
}

/// Storage backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Name of the implementation to use.
	#[serde(default = "default_storage_primary")]
	pub primary: String,
	/// Backend-specific tables keyed by implementation name.
	#[serde(default)]
	pub implementations: HashMap<String, toml::Value>,
}

fn default_storage_primary() -> String {
	"memory".to_string()
}

impl Default for StorageConfig {
	fn default() -> Self {
		Self {
			primary: default_storage_primary(),
			implementations: HashMap::from([(
				default_storage_primary(),
				toml::Value::Table(Default::default()),
			)]),
		}
	}
}

/// Bounds for one polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct PollSettings {
	pub interval_ms: u64,
	pub max_attempts: u32,
	#[serde(default = "default_backoff_multiplier")]
	pub backoff_multiplier: f64,
	#[serde(default = "default_max_interval_ms")]
	pub max_interval_ms: u64,
}

/// Upper bound accepted for `backoff_multiplier`.
pub const MAX_BACKOFF_MULTIPLIER: f64 = 10.0;

fn default_backoff_multiplier() -> f64 {
	1.5
}

fn default_max_interval_ms() -> u64 {
	10_000
}

impl PollSettings {
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}

	pub fn max_interval(&self) -> Duration {
		Duration::from_millis(self.max_interval_ms)
	}
}

/// Polling bounds for the three long-running waits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
	/// Deployment-status polling after an account is first used.
	#[serde(default = "default_deployment_polling")]
	pub deployment: PollSettings,
	/// User-operation receipt polling.
	#[serde(default = "default_receipt_polling")]
	pub receipts: PollSettings,
	/// Intent leg receipt polling.
	#[serde(default = "default_intent_polling")]
	pub intents: PollSettings,
}

fn default_deployment_polling() -> PollSettings {
	PollSettings {
		interval_ms: 2_000,
		max_attempts: 30,
		backoff_multiplier: 1.0,
		max_interval_ms: 2_000,
	}
}

fn default_receipt_polling() -> PollSettings {
	PollSettings {
		interval_ms: 1_000,
		max_attempts: 60,
		backoff_multiplier: 1.5,
		max_interval_ms: 5_000,
	}
}

fn default_intent_polling() -> PollSettings {
	PollSettings {
		interval_ms: 2_000,
		max_attempts: 90,
		backoff_multiplier: 1.5,
		max_interval_ms: 10_000,
	}
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			deployment: default_deployment_polling(),
			receipts: default_receipt_polling(),
			intents: default_intent_polling(),
		}
	}
}

/// Cross-chain intent settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntentConfig {
	pub service_url: String,
	/// Source chains whose accounts need the intent executor.
	pub input_chains: Vec<u64>,
	/// Destination chain.
	pub output_chain: u64,
	/// Tickers queried for the chain-abstracted balance.
	#[serde(default = "default_cab_tickers")]
	pub cab_tickers: Vec<String>,
}

fn default_cab_tickers() -> Vec<String> {
	vec!["USDC".to_string()]
}

/// Session-key permission settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
	/// Call policy module (v0.0.4).
	pub call_policy: Address,
	/// ECDSA signer module bound to the session key.
	pub ecdsa_signer: Address,
	/// Token whose `transfer` the session key may call.
	#[serde(default = "default_session_token")]
	pub token_symbol: String,
	/// Exclusive per-call limit in whole token units.
	#[serde(default = "default_transfer_limit")]
	pub transfer_limit: u64,
}

fn default_session_token() -> String {
	"ZDEV".to_string()
}

fn default_transfer_limit() -> u64 {
	10
}

/// HTTP API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	#[serde(default = "default_faucet_url")]
	pub faucet_url: String,
	#[serde(default = "default_faucet_token")]
	pub faucet_token: String,
	#[serde(default = "default_faucet_blockchain")]
	pub faucet_blockchain: String,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_faucet_url() -> String {
	"https://faucet.circle.com/api/graphql".to_string()
}

fn default_faucet_token() -> String {
	"USDC".to_string()
}

fn default_faucet_blockchain() -> String {
	"BASE".to_string()
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			host: default_api_host(),
			port: default_api_port(),
			faucet_url: default_faucet_url(),
			faucet_token: default_faucet_token(),
			faucet_blockchain: default_faucet_blockchain(),
		}
	}
}

/// Resolves `${VAR}` and `${VAR:-default}` references in a string.
///
/// Input strings are limited to 1MB.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {e}")))?;

	let mut missing = None;
	let resolved = re.replace_all(input, |caps: &regex::Captures<'_>| {
		let var_name = &caps[1];
		match (std::env::var(var_name), caps.get(2)) {
			(Ok(value), _) => value,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				missing.get_or_insert_with(|| var_name.to_string());
				String::new()
			},
		}
	});

	match missing {
		Some(var_name) => Err(ConfigError::Validation(format!(
			"Environment variable '{var_name}' not found"
		))),
		None => Ok(resolved.into_owned()),
	}
}

impl Config {
	/// Loads configuration from a TOML file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let contents = tokio::fs::read_to_string(path).await?;
		let config: Config = contents.parse()?;
		tracing::debug!(path = %path.display(), networks = config.networks.len(), "Loaded configuration");
		Ok(config)
	}

	/// Looks up a configured chain.
	pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
		self.networks.get(&chain_id)
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.app.id.is_empty() {
			return Err(ConfigError::Validation("App ID cannot be empty".into()));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}

		for (chain_id, network) in &self.networks {
			if network.get_http_url().is_none() {
				return Err(ConfigError::Validation(format!(
					"Network {} must have at least one HTTP RPC URL",
					chain_id
				)));
			}
			if network.bundler_url.is_empty() || network.paymaster_url.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} must configure both bundler_url and paymaster_url",
					chain_id
				)));
			}
		}

		if !self.networks.contains_key(&self.app.default_chain) {
			return Err(ConfigError::Validation(format!(
				"Default chain {} is not configured in networks",
				self.app.default_chain
			)));
		}

		if let Some(intent) = &self.intent {
			if intent.input_chains.is_empty() {
				return Err(ConfigError::Validation(
					"Intent input_chains cannot be empty".into(),
				));
			}
			if intent.input_chains.contains(&intent.output_chain) {
				return Err(ConfigError::Validation(format!(
					"Intent output chain {} cannot also be an input chain",
					intent.output_chain
				)));
			}
			for chain_id in intent.input_chains.iter().chain([&intent.output_chain]) {
				if !self.networks.contains_key(chain_id) {
					return Err(ConfigError::Validation(format!(
						"Intent chain {} is not configured in networks",
						chain_id
					)));
				}
			}
			if self.contracts.intent_executor.is_none() {
				return Err(ConfigError::Validation(
					"contracts.intent_executor is required when [intent] is configured".into(),
				));
			}
		}

		for (name, settings) in [
			("deployment", &self.polling.deployment),
			("receipts", &self.polling.receipts),
			("intents", &self.polling.intents),
		] {
			if settings.max_attempts == 0 || settings.interval_ms == 0 {
				return Err(ConfigError::Validation(format!(
					"polling.{} must have non-zero interval_ms and max_attempts",
					name
				)));
			}
			if !(1.0..=MAX_BACKOFF_MULTIPLIER).contains(&settings.backoff_multiplier) {
				return Err(ConfigError::Validation(format!(
					"polling.{}.backoff_multiplier must be between 1.0 and {}",
					name, MAX_BACKOFF_MULTIPLIER
				)));
			}
		}

		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary storage '{}' has no implementation table",
				self.storage.primary
			)));
		}

		Ok(())
	}
}

/// Parses TOML, resolving environment variables first, then validates.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
