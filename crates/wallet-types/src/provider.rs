//! Wallet provider identifiers.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Supported wallet-credential providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
	Privy,
	Dynamic,
	Turnkey,
	Local,
}

impl ProviderKind {
	/// All providers, in display order.
	pub const ALL: [ProviderKind; 4] = [
		ProviderKind::Privy,
		ProviderKind::Dynamic,
		ProviderKind::Turnkey,
		ProviderKind::Local,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ProviderKind::Privy => "privy",
			ProviderKind::Dynamic => "dynamic",
			ProviderKind::Turnkey => "turnkey",
			ProviderKind::Local => "local",
		}
	}
}

impl fmt::Display for ProviderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Error returned for an unknown provider identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid account provider selected: '{0}'")]
pub struct ProviderParseError(pub String);

impl FromStr for ProviderKind {
	type Err = ProviderParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		ProviderKind::ALL
			.into_iter()
			.find(|kind| kind.as_str() == s)
			.ok_or_else(|| ProviderParseError(s.to_string()))
	}
}

/// Provider-reported identity of the signed-in wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedWallet {
	pub provider: ProviderKind,
	pub address: Address,
	/// Email, user name or id, depending on what the provider reports.
	pub user: Option<String>,
}
