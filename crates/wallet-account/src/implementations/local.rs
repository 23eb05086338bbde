//! Local private-key signer.
//!
//! Backs the "local" provider: a key generated in-process and persisted by
//! the caller. It is the only signer able to sign raw transactions.

use crate::{AccountError, SignerInterface, SignerProvider};
use alloy_consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy_dyn_abi::TypedData;
use alloy_eips::eip2718::Encodable2718;
use alloy_network::TxSigner;
use alloy_primitives::{Address, Bytes, Signature, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use wallet_types::{
	authorization_signing_hash, validate_private_key, with_0x_prefix, AuthorizationGrant,
	ConfigSchema, Field, FieldType, Schema, ValidationError,
};

/// Signer holding its private key in memory.
#[derive(Debug, Clone)]
pub struct LocalSigner {
	signer: PrivateKeySigner,
}

impl LocalSigner {
	/// Creates a signer from a hex-encoded private key, with or without 0x prefix.
	pub fn new(private_key_hex: &str) -> Result<Self, AccountError> {
		let signer = private_key_hex
			.parse::<PrivateKeySigner>()
			.map_err(|e| AccountError::InvalidKey(format!("Invalid private key: {}", e)))?;
		Ok(Self { signer })
	}

	/// Generates a fresh random key.
	pub fn generate() -> Self {
		Self {
			signer: PrivateKeySigner::random(),
		}
	}

	/// The private key as 0x-prefixed hex, for persistence.
	pub fn private_key_hex(&self) -> String {
		with_0x_prefix(&hex::encode(self.signer.to_bytes()))
	}

	/// Signs a raw 32-byte digest without any prefixing.
	pub async fn sign_hash(&self, hash: &B256) -> Result<Signature, AccountError> {
		self.signer
			.sign_hash(hash)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign hash: {}", e)))
	}
}

/// Configuration schema for LocalSigner.
pub struct LocalSignerSchema;

impl ConfigSchema for LocalSignerSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("private_key", FieldType::String).with_validator(validate_private_key)],
			vec![],
		)
		.validate(config)
	}
}

#[async_trait]
impl SignerInterface for LocalSigner {
	fn address(&self) -> Address {
		Signer::address(&self.signer)
	}

	async fn sign_message(&self, message: &[u8]) -> Result<Signature, AccountError> {
		self.signer
			.sign_message(message)
			.await
			.map_err(|e| AccountError::SigningFailed(format!("Failed to sign message: {}", e)))
	}

	async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Signature, AccountError> {
		let hash = typed_data
			.eip712_signing_hash()
			.map_err(|e| AccountError::SigningFailed(format!("Invalid typed data: {}", e)))?;
		self.sign_hash(&hash).await
	}

	async fn sign_authorization(
		&self,
		delegate: Address,
		chain_id: u64,
		nonce: u64,
	) -> Result<AuthorizationGrant, AccountError> {
		let hash = authorization_signing_hash(delegate, chain_id, nonce);
		let signature = self.sign_hash(&hash).await?;
		Ok(AuthorizationGrant {
			chain_id,
			nonce,
			delegate,
			signature,
		})
	}

	async fn sign_transaction(&self, mut tx: TxLegacy) -> Result<Bytes, AccountError> {
		let signature = TxSigner::sign_transaction(&self.signer, &mut tx)
			.await
			.map_err(|e| {
				AccountError::SigningFailed(format!("Failed to sign transaction: {}", e))
			})?;
		let envelope = TxEnvelope::from(tx.into_signed(signature));
		Ok(envelope.encoded_2718().into())
	}
}

/// Factory function to create a local signer from configuration.
///
/// Configuration parameters:
/// - `private_key`: 32-byte hex key (required)
pub fn create_signer(config: &toml::Value) -> Result<SignerProvider, AccountError> {
	LocalSignerSchema
		.validate(config)
		.map_err(|e| AccountError::InvalidKey(format!("Invalid configuration: {}", e)))?;

	let private_key = config
		.get("private_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AccountError::InvalidKey("private_key is required".to_string()))?;

	Ok(SignerProvider::Local(LocalSigner::new(private_key)?))
}

/// Registry for the local signer implementation.
pub struct Registry;

impl wallet_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "local";
	type Factory = crate::SignerFactory;

	fn factory() -> Self::Factory {
		create_signer
	}
}

impl crate::SignerRegistry for Registry {}
