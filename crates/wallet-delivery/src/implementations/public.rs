//! Alloy provider backed public chain client.

use super::rpc::{http_client, map_rpc_error};
use crate::{DeliveryError, FeeEstimate, PublicClientInterface};
use alloy_primitives::{Address, Bytes, TxKind};
use alloy_provider::{DynProvider, Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionInput, TransactionRequest};
use async_trait::async_trait;

/// Public client for one chain.
pub struct AlloyPublicClient {
	chain_id: u64,
	provider: DynProvider,
}

impl AlloyPublicClient {
	/// Connects to `rpc_url` with retry backoff.
	pub fn new(chain_id: u64, rpc_url: &str) -> Result<Self, DeliveryError> {
		let client = http_client(rpc_url)?;
		let provider = ProviderBuilder::new().connect_client(client).erased();
		Ok(Self { chain_id, provider })
	}
}

#[async_trait]
impl PublicClientInterface for AlloyPublicClient {
	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn get_code(&self, address: Address) -> Result<Bytes, DeliveryError> {
		self.provider
			.get_code_at(address)
			.await
			.map_err(|e| map_rpc_error("eth_getCode", e))
	}

	async fn get_transaction_count(&self, address: Address) -> Result<u64, DeliveryError> {
		self.provider
			.get_transaction_count(address)
			.pending()
			.await
			.map_err(|e| map_rpc_error("eth_getTransactionCount", e))
	}

	async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, DeliveryError> {
		let request = TransactionRequest {
			to: Some(TxKind::Call(to)),
			input: TransactionInput::new(data),
			..Default::default()
		};
		self.provider
			.call(request)
			.await
			.map_err(|e| map_rpc_error("eth_call", e))
	}

	async fn estimate_fees(&self) -> Result<FeeEstimate, DeliveryError> {
		let estimate = self
			.provider
			.estimate_eip1559_fees()
			.await
			.map_err(|e| map_rpc_error("eth_feeHistory", e))?;
		Ok(FeeEstimate {
			max_fee_per_gas: estimate.max_fee_per_gas,
			max_priority_fee_per_gas: estimate.max_priority_fee_per_gas,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::super::rpc::test_support::{rpc_error, rpc_result};
	use super::*;
	use serde_json::json;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer};

	#[tokio::test]
	async fn test_get_code_and_nonce() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({"method": "eth_getCode"})))
			.respond_with(rpc_result(json!(
				"0xef0100d6cedde84be40893d153be9d467cd6ad37875b28"
			)))
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "eth_getTransactionCount",
				"params": ["0x0000000000000000000000000000000000000001", "pending"]
			})))
			.respond_with(rpc_result(json!("0x2")))
			.mount(&server)
			.await;

		let client = AlloyPublicClient::new(84532, &server.uri()).unwrap();
		let address = Address::with_last_byte(1);
		let code = client.get_code(address).await.unwrap();
		assert_eq!(&code[..3], &[0xef, 0x01, 0x00]);
		assert_eq!(client.get_transaction_count(address).await.unwrap(), 2);
	}

	#[tokio::test]
	async fn test_call_revert_is_rejection() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(rpc_error(3, "execution reverted"))
			.mount(&server)
			.await;

		let client = AlloyPublicClient::new(84532, &server.uri()).unwrap();
		let err = client
			.call(Address::ZERO, Bytes::new())
			.await
			.unwrap_err();
		assert!(matches!(err, DeliveryError::Rejected { code: 3, .. }));
	}
}
