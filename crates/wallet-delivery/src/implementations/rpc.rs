//! Shared JSON-RPC plumbing for the alloy-backed clients.

use crate::DeliveryError;
use alloy_rpc_client::RpcClient;
use alloy_transport::layers::RetryBackoffLayer;
use alloy_transport::{RpcError, TransportErrorKind};

/// Builds an HTTP JSON-RPC client with retry on rate limits and transient errors.
pub(crate) fn http_client(url: &str) -> Result<RpcClient, DeliveryError> {
	let url = url
		.parse()
		.map_err(|e| DeliveryError::Configuration(format!("Invalid RPC URL {}: {}", url, e)))?;

	// 5 retries, 1s initial backoff, 10 compute units per second
	let retry_layer = RetryBackoffLayer::new(5, 1000, 10);
	Ok(RpcClient::builder().layer(retry_layer).http(url))
}

/// Maps an alloy RPC failure, keeping JSON-RPC error responses as rejections.
pub(crate) fn map_rpc_error(method: &str, error: RpcError<TransportErrorKind>) -> DeliveryError {
	match error {
		RpcError::ErrorResp(payload) => DeliveryError::Rejected {
			code: payload.code,
			message: payload.message.to_string(),
		},
		other => DeliveryError::Network(format!("{} failed: {}", method, other)),
	}
}

#[cfg(test)]
pub(crate) mod test_support {
	use serde_json::json;
	use wiremock::{Request, ResponseTemplate};

	/// Responder answering with `result` under the request's own id.
	pub fn rpc_result(
		result: serde_json::Value,
	) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
		move |request: &Request| {
			let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
			ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0",
				"id": body["id"],
				"result": result
			}))
		}
	}

	/// Responder answering with a JSON-RPC error under the request's own id.
	pub fn rpc_error(
		code: i64,
		message: &'static str,
	) -> impl Fn(&Request) -> ResponseTemplate + Send + Sync + 'static {
		move |request: &Request| {
			let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
			ResponseTemplate::new(200).set_body_json(json!({
				"jsonrpc": "2.0",
				"id": body["id"],
				"error": {"code": code, "message": message}
			}))
		}
	}
}
