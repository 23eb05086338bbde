//! Persisted session keys, one per provider and wallet address.

use crate::policy::CallPolicy;
use crate::session::{SerializedSessionKey, SessionAccount, SessionKey};
use crate::{SessionError, SessionModules};
use alloy_primitives::Address;
use std::sync::Arc;
use wallet_smart_account::TransactionClient;
use wallet_storage::{StorageError, StorageService};
use wallet_types::{ProviderKind, StorageKey};

/// Creates, stores and restores session keys.
pub struct SessionKeyManager {
	storage: Arc<StorageService>,
	modules: SessionModules,
}

impl SessionKeyManager {
	pub fn new(storage: Arc<StorageService>, modules: SessionModules) -> Self {
		Self { storage, modules }
	}

	fn storage_id(provider: ProviderKind, address: Address) -> String {
		format!("{}:{}", provider, address)
	}

	/// Returns the session account for `provider` and `root`'s address.
	///
	/// A valid stored token is restored as-is. A missing or unreadable token
	/// leads to a fresh key bound to `policy`, which is then stored.
	pub async fn create_session_key(
		&self,
		provider: ProviderKind,
		root: &TransactionClient,
		policy: CallPolicy,
	) -> Result<SessionAccount, SessionError> {
		let id = Self::storage_id(provider, root.account().address());

		match self.load(&id, root).await {
			Ok(Some(account)) => {
				tracing::debug!(
					provider = %provider,
					session_key = %account.session_key_address(),
					"Restored session key"
				);
				return Ok(account);
			},
			Ok(None) => {},
			Err(SessionError::Deserialization(reason)) => {
				tracing::warn!(provider = %provider, %reason, "Discarding unreadable session key");
				self.storage.remove(StorageKey::SessionKeys, &id).await?;
			},
			Err(e) => return Err(e),
		}

		let account = SessionKey::derive()
			.bind_policy(policy)
			.install(root, &self.modules)
			.await?;
		let token = account.serialize()?;
		self.storage
			.store(StorageKey::SessionKeys, &id, &token)
			.await?;

		tracing::info!(
			provider = %provider,
			session_key = %account.session_key_address(),
			"Created session key"
		);
		Ok(account)
	}

	/// Removes the stored session key, if any.
	pub async fn clear(
		&self,
		provider: ProviderKind,
		address: Address,
	) -> Result<(), SessionError> {
		self.storage
			.remove(StorageKey::SessionKeys, &Self::storage_id(provider, address))
			.await?;
		Ok(())
	}

	async fn load(
		&self,
		id: &str,
		root: &TransactionClient,
	) -> Result<Option<SessionAccount>, SessionError> {
		let token = match self
			.storage
			.retrieve_optional::<SerializedSessionKey>(StorageKey::SessionKeys, id)
			.await
		{
			Ok(Some(token)) => token,
			Ok(None) => return Ok(None),
			Err(StorageError::Corrupt { message, .. }) => {
				return Err(SessionError::Deserialization(message))
			},
			Err(e) => return Err(e.into()),
		};
		SessionAccount::deserialize(&token, root).map(Some)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::session::tests::{delegated_public, modules, root_client, TOKEN};
	use wallet_delivery::{MockBundlerInterface, MockPaymasterInterface};
	use wallet_storage::implementations::{file::FileStorage, memory::MemoryStorage};
	use wallet_storage::StorageInterface;

	fn manager() -> (SessionKeyManager, Arc<StorageService>) {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		(SessionKeyManager::new(storage.clone(), modules()), storage)
	}

	fn root() -> TransactionClient {
		root_client(
			delegated_public(false),
			MockBundlerInterface::new(),
			MockPaymasterInterface::new(),
		)
	}

	fn policy() -> CallPolicy {
		CallPolicy::token_transfer_limit(TOKEN, 6, 10)
	}

	#[tokio::test]
	async fn test_create_is_idempotent() {
		let (manager, storage) = manager();
		let root = root();

		let first = manager
			.create_session_key(ProviderKind::Local, &root, policy())
			.await
			.unwrap();
		let id = format!("local:{}", root.account().address());
		assert!(storage.exists(StorageKey::SessionKeys, &id).await.unwrap());

		let second = manager
			.create_session_key(ProviderKind::Local, &root, policy())
			.await
			.unwrap();
		assert_eq!(second.session_key_address(), first.session_key_address());
	}

	#[tokio::test]
	async fn test_keys_are_scoped_per_provider() {
		let (manager, _) = manager();
		let root = root();

		let local = manager
			.create_session_key(ProviderKind::Local, &root, policy())
			.await
			.unwrap();
		let privy = manager
			.create_session_key(ProviderKind::Privy, &root, policy())
			.await
			.unwrap();
		assert_ne!(local.session_key_address(), privy.session_key_address());
	}

	#[tokio::test]
	async fn test_corrupt_token_is_replaced() {
		let (manager, storage) = manager();
		let root = root();
		let id = format!("local:{}", root.account().address());
		storage
			.store(StorageKey::SessionKeys, &id, &"definitely not a token")
			.await
			.unwrap();

		let account = manager
			.create_session_key(ProviderKind::Local, &root, policy())
			.await
			.unwrap();

		let stored: SerializedSessionKey = storage
			.retrieve(StorageKey::SessionKeys, &id)
			.await
			.unwrap();
		let restored = SessionAccount::deserialize(&stored, &root).unwrap();
		assert_eq!(restored.session_key_address(), account.session_key_address());
	}

	#[tokio::test]
	async fn test_damaged_file_entry_is_replaced() {
		let dir = tempfile::tempdir().unwrap();
		let root = root();
		let key = format!("session_keys:local:{}", root.account().address());
		FileStorage::new(dir.path().to_path_buf())
			.set_bytes(&key, vec![0xff, 0x00, 0x13, 0x37])
			.await
			.unwrap();

		let storage = Arc::new(StorageService::new(Box::new(FileStorage::new(
			dir.path().to_path_buf(),
		))));
		let manager = SessionKeyManager::new(storage.clone(), modules());
		let account = manager
			.create_session_key(ProviderKind::Local, &root, policy())
			.await
			.unwrap();

		let id = format!("local:{}", root.account().address());
		let stored: SerializedSessionKey = storage
			.retrieve(StorageKey::SessionKeys, &id)
			.await
			.unwrap();
		let restored = SessionAccount::deserialize(&stored, &root).unwrap();
		assert_eq!(restored.session_key_address(), account.session_key_address());
	}

	#[tokio::test]
	async fn test_clear_forces_new_key() {
		let (manager, _) = manager();
		let root = root();
		let first = manager
			.create_session_key(ProviderKind::Local, &root, policy())
			.await
			.unwrap();

		manager
			.clear(ProviderKind::Local, root.account().address())
			.await
			.unwrap();
		let second = manager
			.create_session_key(ProviderKind::Local, &root, policy())
			.await
			.unwrap();
		assert_ne!(second.session_key_address(), first.session_key_address());
	}
}
