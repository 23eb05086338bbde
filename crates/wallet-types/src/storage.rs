//! Storage namespaces for persisted playground state.

use std::str::FromStr;

/// Namespaces under which values are persisted.
///
/// Keys take the form `"{namespace}:{id}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Serialized session-key tokens, one per provider and wallet address.
	SessionKeys,
	/// Private key backing the local provider.
	LocalAccount,
}

impl StorageKey {
	/// Returns the namespace string for this key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::SessionKeys => "session_keys",
			StorageKey::LocalAccount => "local_account",
		}
	}

	/// Returns all known namespaces.
	pub fn all() -> impl Iterator<Item = Self> {
		[StorageKey::SessionKeys, StorageKey::LocalAccount].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"session_keys" => Ok(StorageKey::SessionKeys),
			"local_account" => Ok(StorageKey::LocalAccount),
			_ => Err(()),
		}
	}
}
