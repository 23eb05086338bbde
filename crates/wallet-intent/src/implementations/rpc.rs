//! Intent service client over JSON-RPC.

use crate::{IntentError, IntentInterface};
use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use wallet_types::{
	truncate_id, CabBalance, CabRequest, ExecutionReceipt, IntentQuote, IntentQuoteRequest,
	IntentRequest, IntentSubmission, JsonRpcErrorObject, JsonRpcRequest, OpenReceipt, SignedIntent,
};

/// Intent service reached through `ui_*` methods.
pub struct RpcIntentService {
	client: Client,
	url: String,
	next_id: AtomicU64,
}

impl RpcIntentService {
	pub fn new(url: impl Into<String>) -> Self {
		Self {
			client: Client::new(),
			url: url.into(),
			next_id: AtomicU64::new(1),
		}
	}

	/// Performs one call. A `null` result is handed to `R` as-is so that
	/// optional receipts deserialize to `None`.
	async fn rpc<P: Serialize, R: DeserializeOwned>(
		&self,
		method: &str,
		params: P,
	) -> Result<R, IntentError> {
		let id = self.next_id.fetch_add(1, Ordering::Relaxed);
		let response = self
			.client
			.post(&self.url)
			.json(&JsonRpcRequest::new(id, method, params))
			.send()
			.await
			.map_err(|e| IntentError::Network(format!("Failed to call {}: {}", method, e)))?;

		let status = response.status();
		if !status.is_success() {
			let text = response.text().await.unwrap_or_default();
			return Err(IntentError::Network(format!(
				"{} failed with status {}: {}",
				method, status, text
			)));
		}

		let mut body: serde_json::Value = response
			.json()
			.await
			.map_err(|e| {
				IntentError::Network(format!("Failed to parse {} response: {}", method, e))
			})?;

		match body.get_mut("error").map(serde_json::Value::take) {
			Some(serde_json::Value::Null) | None => {},
			Some(error) => {
				let error: JsonRpcErrorObject = serde_json::from_value(error).map_err(|e| {
					IntentError::Network(format!("Malformed {} error: {}", method, e))
				})?;
				return Err(IntentError::Rejected {
					code: error.code,
					message: error.message,
				});
			},
		}

		let result = body
			.get_mut("result")
			.map(serde_json::Value::take)
			.unwrap_or_default();
		serde_json::from_value(result)
			.map_err(|e| IntentError::Network(format!("Unexpected {} result: {}", method, e)))
	}
}

#[async_trait]
impl IntentInterface for RpcIntentService {
	async fn get_intent(
		&self,
		sender: Address,
		request: &IntentRequest,
	) -> Result<IntentQuote, IntentError> {
		let quote_request = IntentQuoteRequest {
			sender,
			calls: &request.calls,
			input_tokens: &request.input_tokens,
			output_tokens: &request.output_tokens,
		};
		let quote: IntentQuote = self.rpc("ui_getIntent", (quote_request,)).await?;
		tracing::debug!(%sender, orders = quote.orders.len(), "Received intent quote");
		Ok(quote)
	}

	async fn send_user_intent(
		&self,
		intent: &SignedIntent,
	) -> Result<IntentSubmission, IntentError> {
		let submission: IntentSubmission = self.rpc("ui_sendUserIntent", (intent,)).await?;
		tracing::info!(
			output_ui_hash = %truncate_id(&submission.output_ui_hash.ui_hash.to_string()),
			input_legs = submission.inputs_ui_hash.len(),
			"Submitted intent"
		);
		Ok(submission)
	}

	async fn get_open_receipt(&self, ui_hash: B256) -> Result<Option<OpenReceipt>, IntentError> {
		self.rpc("ui_getUserIntentOpenReceipt", (ui_hash,)).await
	}

	async fn get_execution_receipt(
		&self,
		ui_hash: B256,
	) -> Result<Option<ExecutionReceipt>, IntentError> {
		self.rpc("ui_getUserIntentExecutionReceipt", (ui_hash,)).await
	}

	async fn get_cab(&self, request: &CabRequest) -> Result<CabBalance, IntentError> {
		self.rpc("ui_getCAB", (request,)).await
	}
}
