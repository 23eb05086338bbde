//! ERC-4337 bundler client over JSON-RPC.

use super::rpc::{http_client, map_rpc_error};
use crate::{BundlerInterface, DeliveryError};
use alloy_primitives::{Address, B256};
use alloy_rpc_client::RpcClient;
use async_trait::async_trait;
use wallet_types::{truncate_id, GasEstimate, UserOperation, UserOperationReceipt};

/// Bundler reached through `eth_*UserOperation*` methods.
pub struct RpcBundlerClient {
	client: RpcClient,
}

impl RpcBundlerClient {
	pub fn new(url: &str) -> Result<Self, DeliveryError> {
		Ok(Self {
			client: http_client(url)?,
		})
	}
}

#[async_trait]
impl BundlerInterface for RpcBundlerClient {
	async fn send_user_operation(
		&self,
		op: &UserOperation,
		entry_point: Address,
	) -> Result<B256, DeliveryError> {
		let hash: B256 = self
			.client
			.request("eth_sendUserOperation", (op.clone(), entry_point))
			.await
			.map_err(|e| map_rpc_error("eth_sendUserOperation", e))?;

		tracing::info!(
			sender = %op.sender,
			user_op_hash = %truncate_id(&hash.to_string()),
			"Submitted user operation"
		);
		Ok(hash)
	}

	async fn estimate_user_operation_gas(
		&self,
		op: &UserOperation,
		entry_point: Address,
	) -> Result<GasEstimate, DeliveryError> {
		self.client
			.request("eth_estimateUserOperationGas", (op.clone(), entry_point))
			.await
			.map_err(|e| map_rpc_error("eth_estimateUserOperationGas", e))
	}

	async fn get_user_operation_receipt(
		&self,
		hash: B256,
	) -> Result<Option<UserOperationReceipt>, DeliveryError> {
		self.client
			.request("eth_getUserOperationReceipt", (hash,))
			.await
			.map_err(|e| map_rpc_error("eth_getUserOperationReceipt", e))
	}
}
