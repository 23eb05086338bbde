//! Paymaster client using the `zd_sponsorUserOperation` method.

use super::rpc::{http_client, map_rpc_error};
use crate::{DeliveryError, PaymasterInterface};
use alloy_primitives::{Address, U64};
use alloy_rpc_client::RpcClient;
use async_trait::async_trait;
use serde::Serialize;
use wallet_types::{SponsorshipData, UserOperation};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SponsorRequest {
	chain_id: U64,
	user_op: UserOperation,
	entry_point_address: Address,
	should_override_fee: bool,
	should_consume: bool,
}

/// Paymaster bound to one chain.
pub struct RpcPaymasterClient {
	chain_id: u64,
	client: RpcClient,
}

impl RpcPaymasterClient {
	pub fn new(chain_id: u64, url: &str) -> Result<Self, DeliveryError> {
		Ok(Self {
			chain_id,
			client: http_client(url)?,
		})
	}
}

#[async_trait]
impl PaymasterInterface for RpcPaymasterClient {
	async fn sponsor_user_operation(
		&self,
		op: &UserOperation,
		entry_point: Address,
	) -> Result<SponsorshipData, DeliveryError> {
		let request = SponsorRequest {
			chain_id: U64::from(self.chain_id),
			user_op: op.clone(),
			entry_point_address: entry_point,
			should_override_fee: false,
			should_consume: true,
		};

		let sponsorship: SponsorshipData = self
			.client
			.request("zd_sponsorUserOperation", (request,))
			.await
			.map_err(|e| map_rpc_error("zd_sponsorUserOperation", e))?;

		tracing::debug!(
			chain_id = self.chain_id,
			paymaster = %sponsorship.paymaster,
			"Received gas sponsorship"
		);
		Ok(sponsorship)
	}
}

#[cfg(test)]
mod tests {
	use super::super::rpc::test_support::{rpc_error, rpc_result};
	use super::*;
	use alloy_primitives::U256;
	use serde_json::json;
	use wiremock::matchers::{body_partial_json, method};
	use wiremock::{Mock, MockServer};

	#[tokio::test]
	async fn test_sponsorship_request_carries_chain() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.and(body_partial_json(json!({
				"method": "zd_sponsorUserOperation",
				"params": [{"chainId": "0x14a34", "shouldConsume": true}]
			})))
			.respond_with(rpc_result(json!({
				"paymaster": "0x0000000000000000000000000000000000000009",
				"paymasterData": "0x1234",
				"paymasterVerificationGasLimit": "0x8000",
				"paymasterPostOpGasLimit": "0x1",
				"callGasLimit": "0x5000",
				"verificationGasLimit": "0x6000",
				"preVerificationGas": "0x7000"
			})))
			.expect(1)
			.mount(&server)
			.await;

		let paymaster = RpcPaymasterClient::new(84532, &server.uri()).unwrap();
		let entry_point: Address = "0x0000000071727De22E5E9d8BAf0edAc6f37da032".parse().unwrap();
		let sponsorship = paymaster
			.sponsor_user_operation(&UserOperation::default(), entry_point)
			.await
			.unwrap();

		assert_eq!(sponsorship.paymaster, Address::with_last_byte(9));
		assert!(sponsorship.has_gas_limits());
		assert_eq!(sponsorship.call_gas_limit, Some(U256::from(0x5000)));
	}

	#[tokio::test]
	async fn test_refused_sponsorship_is_rejection() {
		let server = MockServer::start().await;
		Mock::given(method("POST"))
			.respond_with(rpc_error(-32602, "gas policy not satisfied"))
			.mount(&server)
			.await;

		let paymaster = RpcPaymasterClient::new(84532, &server.uri()).unwrap();
		assert!(matches!(
			paymaster
				.sponsor_user_operation(&UserOperation::default(), Address::ZERO)
				.await,
			Err(DeliveryError::Rejected { code: -32602, .. })
		));
	}
}
