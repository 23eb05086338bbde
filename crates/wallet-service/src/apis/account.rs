//! Account status per chain.

use crate::{error::ApiError, server::AppState};
use alloy_primitives::Address;
use axum::{
	extract::{Path, State},
	Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
	pub chain_id: u64,
	/// Address of the signed-in account, `None` before login.
	pub address: Option<Address>,
	pub deployed: bool,
	pub ecdsa_validator: Address,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub explorer_url: Option<String>,
}

/// GET /api/account/{chain_id}
pub async fn handle_get_account(
	State(state): State<AppState>,
	Path(chain_id): Path<u64>,
) -> Result<Json<AccountResponse>, ApiError> {
	let chain = state
		.config
		.chain(chain_id)
		.ok_or_else(|| ApiError::BadRequest(format!("Chain {} is not configured", chain_id)))?;

	let context = state.selector.current().await?;
	let address = context.embedded_wallet().await.map(|wallet| wallet.address);
	let deployed = context.is_deployed(chain_id).await?;

	Ok(Json(AccountResponse {
		chain_id,
		address,
		deployed,
		ecdsa_validator: context.ecdsa_validator(),
		explorer_url: address.and_then(|a| chain.explorer_address_url(&a)),
	}))
}

#[cfg(test)]
mod tests {
	use crate::apis::test_support::{app, get, send};
	use axum::http::StatusCode;

	#[tokio::test]
	async fn test_account_before_login() {
		let app = app("http://127.0.0.1:9/faucet");
		let (status, body) = send(&app, get("/api/account/84532")).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["chainId"], 84532);
		assert!(body["address"].is_null());
		assert_eq!(body["deployed"], false);
		assert_eq!(
			body["ecdsaValidator"].as_str().unwrap().to_lowercase(),
			"0x845adb2c711129d4f3966735ed98a9f09fc4ce57"
		);
	}

	#[tokio::test]
	async fn test_unknown_chain_is_bad_request() {
		let app = app("http://127.0.0.1:9/faucet");
		let (status, body) = send(&app, get("/api/account/1")).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["message"], "Chain 1 is not configured");
	}
}
