//! Handlers of the `/api` routes.
//!
//! # Endpoints
//!
//! - `GET|POST /api/provider` - Provider selection
//! - `POST /api/login` - Sign in with the selected provider
//! - `GET /api/account/{chain_id}` - Account status on one chain
//! - `GET /api/actions`, `POST /api/actions/*` - Tracked wallet actions
//! - `GET /api/cab` - Chain-abstracted balance over the intent chains
//! - `POST /api/faucet` - Test token faucet proxy

pub mod account;
pub mod actions;
pub mod cab;
pub mod faucet;
pub mod provider;

#[cfg(test)]
pub(crate) mod test_support {
	use crate::server::{build_router, AppState};
	use axum::body::{to_bytes, Body};
	use axum::http::{Request, StatusCode};
	use axum::Router;
	use serde_json::Value;
	use tower::ServiceExt;
	use wallet_config::Config;
	use wallet_core::WalletServices;

	pub const CONFIG: &str = r#"
[app]
id = "aa-playground-test"
default_chain = 84532

[contracts]
kernel_implementation = "0xd6CEDDe84be40893d153Be9d467CD6aD37875b28"
ecdsa_validator = "0x845ADb2C711129d4f3966735eD98a9F09fC4cE57"

[networks.84532]
name = "Base Sepolia"
bundler_url = "http://127.0.0.1:9/bundler"
paymaster_url = "http://127.0.0.1:9/paymaster"
explorer_url = "https://sepolia.basescan.org"
[[networks.84532.rpc_urls]]
http = "http://127.0.0.1:9/rpc"
"#;

	/// Router over `CONFIG`, with the faucet pointed at `faucet_url`.
	pub fn app(faucet_url: &str) -> Router {
		let mut config: Config = CONFIG.parse().unwrap();
		config.api.faucet_url = faucet_url.to_string();
		let services = WalletServices::from_config(config).unwrap();
		build_router(AppState::new(services).unwrap())
	}

	/// Sends `request` and returns the status and the JSON body.
	pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let json = if body.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&body).unwrap()
		};
		(status, json)
	}

	pub fn get(uri: &str) -> Request<Body> {
		Request::builder().uri(uri).body(Body::empty()).unwrap()
	}

	pub fn post_json(uri: &str, body: Value) -> Request<Body> {
		Request::builder()
			.method("POST")
			.uri(uri)
			.header("content-type", "application/json")
			.body(Body::from(body.to_string()))
			.unwrap()
	}
}
