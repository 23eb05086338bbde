//! HTTP server for the playground API.

use crate::apis::{account, actions, cab, faucet, provider};
use axum::{
	routing::{get, post},
	Router, ServiceExt,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;
use wallet_config::Config;
use wallet_core::{ProviderSelector, WalletServices};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Selected provider and its context.
	pub selector: Arc<ProviderSelector>,
	pub config: Arc<Config>,
	/// HTTP client for the faucet proxy.
	pub http_client: reqwest::Client,
}

impl AppState {
	/// Selects the configured default provider over `services`.
	pub fn new(services: WalletServices) -> Result<Self, reqwest::Error> {
		let config = services.config.clone();
		let http_client = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.timeout(Duration::from_secs(30))
			.build()?;
		let selector = ProviderSelector::new(services, &config.app.default_provider);

		Ok(Self {
			selector: Arc::new(selector),
			config,
			http_client,
		})
	}
}

/// Routes of the `/api` surface.
pub fn build_router(state: AppState) -> Router {
	let action_routes = Router::new()
		.route("/", get(actions::handle_get_actions))
		.route("/send-transaction", post(actions::handle_send_transaction))
		.route("/send-user-operation", post(actions::handle_send_user_operation))
		.route("/create-session-key", post(actions::handle_create_session_key))
		.route("/send-via-session-key", post(actions::handle_send_via_session_key))
		.route("/create-intent-client", post(actions::handle_create_intent_client))
		.route("/send-intent", post(actions::handle_send_intent));

	let api_routes = Router::new()
		.route(
			"/provider",
			get(provider::handle_get_provider).post(provider::handle_select_provider),
		)
		.route("/login", post(provider::handle_login))
		.route("/account/{chain_id}", get(account::handle_get_account))
		.route("/cab", get(cab::handle_get_cab))
		.route("/faucet", post(faucet::handle_faucet))
		.nest("/actions", action_routes);

	Router::new()
		.nest("/api", api_routes)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(state)
}

/// Serves the API until the listener fails.
pub async fn start_server(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
	let bind_address = format!("{}:{}", state.config.api.host, state.config.api.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Playground API server starting on {}", bind_address);

	// Trailing slashes route like their trimmed form
	let app = NormalizePath::trim_trailing_slash(build_router(state));
	let service = ServiceExt::<axum::http::Request<axum::body::Body>>::into_make_service(app);

	axum::serve(listener, service).await?;

	Ok(())
}
