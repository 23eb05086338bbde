//! Provider selection and login.

use crate::{error::ApiError, server::AppState};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use wallet_core::{Credentials, ProviderSelection, ProviderSelector};
use wallet_types::{EmbeddedWallet, ProviderKind};

/// Current selection and signed-in wallet.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
	pub provider: Option<ProviderKind>,
	/// Rejection message of an invalid selection.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	pub wallet: Option<EmbeddedWallet>,
}

#[derive(Debug, Deserialize)]
pub struct SelectProviderRequest {
	pub provider: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
	/// Replace the local key with a freshly generated one.
	#[serde(default)]
	pub create_account: bool,
	#[serde(flatten)]
	pub credentials: Credentials,
}

async fn describe(selector: &ProviderSelector) -> ProviderResponse {
	match selector.selection().await {
		ProviderSelection::Valid(kind) => {
			let wallet = match selector.current().await {
				Ok(context) => context.embedded_wallet().await,
				Err(_) => None,
			};
			ProviderResponse {
				provider: Some(kind),
				error: None,
				wallet,
			}
		},
		ProviderSelection::Invalid(message) => ProviderResponse {
			provider: None,
			error: Some(message),
			wallet: None,
		},
	}
}

/// GET /api/provider
pub async fn handle_get_provider(State(state): State<AppState>) -> Json<ProviderResponse> {
	Json(describe(&state.selector).await)
}

/// POST /api/provider
///
/// An unknown provider is rejected with 400 and leaves no provider selected.
pub async fn handle_select_provider(
	State(state): State<AppState>,
	Json(request): Json<SelectProviderRequest>,
) -> Result<Json<ProviderResponse>, ApiError> {
	match state.selector.select(&request.provider).await {
		ProviderSelection::Valid(_) => Ok(Json(describe(&state.selector).await)),
		ProviderSelection::Invalid(message) => Err(ApiError::BadRequest(message)),
	}
}

/// POST /api/login
pub async fn handle_login(
	State(state): State<AppState>,
	Json(request): Json<LoginRequest>,
) -> Result<Json<EmbeddedWallet>, ApiError> {
	let context = state.selector.current().await?;
	let wallet = if request.create_account {
		context.create_account().await?
	} else {
		context.login(&request.credentials).await?
	};
	Ok(Json(wallet))
}

#[cfg(test)]
mod tests {
	use crate::apis::test_support::{app, get, post_json, send};
	use axum::http::StatusCode;
	use serde_json::json;

	#[tokio::test]
	async fn test_default_provider_is_local() {
		let app = app("http://127.0.0.1:9/faucet");
		let (status, body) = send(&app, get("/api/provider")).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["provider"], "local");
		assert!(body["wallet"].is_null());
	}

	#[tokio::test]
	async fn test_invalid_provider_is_rejected() {
		let app = app("http://127.0.0.1:9/faucet");
		let (status, body) =
			send(&app, post_json("/api/provider", json!({"provider": "metamask"}))).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["message"], "Invalid account provider selected: 'metamask'");

		let (_, body) = send(&app, get("/api/provider")).await;
		assert!(body["provider"].is_null());
		assert_eq!(body["error"], "Invalid account provider selected: 'metamask'");

		let (status, body) = send(&app, post_json("/api/login", json!({}))).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "unsupported");
	}

	#[tokio::test]
	async fn test_local_login_then_switch() {
		let app = app("http://127.0.0.1:9/faucet");
		let (status, wallet) = send(&app, post_json("/api/login", json!({}))).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(wallet["provider"], "local");

		let (_, body) = send(&app, get("/api/provider")).await;
		assert_eq!(body["wallet"]["address"], wallet["address"]);

		let (status, body) =
			send(&app, post_json("/api/provider", json!({"provider": "turnkey"}))).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["provider"], "turnkey");
		assert!(body["wallet"].is_null());
	}

	#[tokio::test]
	async fn test_hosted_login_requires_configuration() {
		let app = app("http://127.0.0.1:9/faucet");
		send(&app, post_json("/api/provider", json!({"provider": "privy"}))).await;
		let (status, body) =
			send(&app, post_json("/api/login", json!({"token": "access-token"}))).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "prerequisite_missing");
	}
}
