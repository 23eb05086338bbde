//! Proxy to the Circle test-token faucet.

use crate::{error::ApiError, server::AppState};
use alloy_primitives::Address;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

const REQUEST_TOKEN_QUERY: &str = "mutation RequestToken($input: RequestTokenInput!) {\n  requestToken(input: $input) {\n    ...RequestTokenResponseInfo\n    __typename\n  }\n}\n\nfragment RequestTokenResponseInfo on RequestTokenResponse {\n  amount\n  blockchain\n  contractAddress\n  currency\n  destinationAddress\n  explorerLink\n  hash\n  status\n  __typename\n}";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaucetRequest {
	pub destination_address: Address,
}

/// POST /api/faucet
///
/// Forwards the request as a `RequestToken` mutation and returns the
/// faucet's JSON unchanged.
pub async fn handle_faucet(
	State(state): State<AppState>,
	Json(request): Json<FaucetRequest>,
) -> Result<Json<Value>, ApiError> {
	let api = &state.config.api;
	let body = json!({
		"operationName": "RequestToken",
		"variables": {
			"input": {
				"destinationAddress": request.destination_address,
				"token": api.faucet_token,
				"blockchain": api.faucet_blockchain,
			}
		},
		"query": REQUEST_TOKEN_QUERY,
	});

	let response = state
		.http_client
		.post(&api.faucet_url)
		.json(&body)
		.send()
		.await
		.map_err(|e| ApiError::Upstream(format!("Failed to reach faucet: {}", e)))?;
	let data = response
		.json::<Value>()
		.await
		.map_err(|e| ApiError::Upstream(format!("Failed to parse faucet response: {}", e)))?;

	tracing::info!(destination = %request.destination_address, "Requested faucet tokens");
	Ok(Json(data))
}
