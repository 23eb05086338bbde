//! JSON-RPC 2.0 envelopes for services reached over plain HTTP.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// JSON-RPC request body.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<P> {
	pub jsonrpc: &'static str,
	pub id: u64,
	pub method: String,
	pub params: P,
}

impl<P: Serialize> JsonRpcRequest<P> {
	pub fn new(id: u64, method: impl Into<String>, params: P) -> Self {
		Self {
			jsonrpc: "2.0",
			id,
			method: method.into(),
			params,
		}
	}
}

/// Error object carried by a failed JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
	pub code: i64,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub data: Option<serde_json::Value>,
}

impl fmt::Display for JsonRpcErrorObject {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} (code {})", self.message, self.code)
	}
}

/// JSON-RPC response body.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse<R> {
	#[serde(default)]
	pub id: Option<serde_json::Value>,
	pub result: Option<R>,
	#[serde(default)]
	pub error: Option<JsonRpcErrorObject>,
}

impl<R: DeserializeOwned> JsonRpcResponse<R> {
	/// Splits the response into its result or error object.
	///
	/// A response with neither field set is treated as an error with code 0.
	pub fn into_result(self) -> Result<R, JsonRpcErrorObject> {
		match (self.result, self.error) {
			(_, Some(error)) => Err(error),
			(Some(result), None) => Ok(result),
			(None, None) => Err(JsonRpcErrorObject {
				code: 0,
				message: "Response carried neither result nor error".to_string(),
				data: None,
			}),
		}
	}
}
