//! Tracked wallet actions.
//!
//! Every action runs through the selected context's tracker and answers
//! with the resulting state. Failures are reported inside that state;
//! only a missing provider selection is an HTTP error.

use crate::{error::ApiError, server::AppState};
use alloy_primitives::{Address, U256};
use axum::{extract::State, Json};
use serde::Deserialize;
use std::collections::BTreeMap;
use wallet_core::{ActionKind, ActionState, ActionSuccess, WalletError};
use wallet_types::{Call, IntentRequest};

/// Calls to run on one chain.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallsRequest {
	/// Defaults to the configured default chain.
	#[serde(default)]
	pub chain_id: Option<u64>,
	/// An empty list sends a single no-op call.
	#[serde(default)]
	pub calls: Vec<Call>,
}

impl CallsRequest {
	fn calls(&self) -> Vec<Call> {
		if self.calls.is_empty() {
			vec![Call::noop()]
		} else {
			self.calls.clone()
		}
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainRequest {
	#[serde(default)]
	pub chain_id: Option<u64>,
}

/// Token transfer through the session key.
#[derive(Debug, Deserialize)]
pub struct SessionTransferRequest {
	pub recipient: Address,
	/// Amount in the token's base units.
	pub amount: U256,
}

/// GET /api/actions
pub async fn handle_get_actions(
	State(state): State<AppState>,
) -> Result<Json<BTreeMap<ActionKind, ActionState>>, ApiError> {
	let context = state.selector.current().await?;
	Ok(Json(context.actions().snapshot()))
}

/// POST /api/actions/send-transaction
pub async fn handle_send_transaction(
	State(state): State<AppState>,
	Json(request): Json<CallsRequest>,
) -> Result<Json<ActionState>, ApiError> {
	let context = state.selector.current().await?;
	let chain_id = request.chain_id.unwrap_or(state.config.app.default_chain);
	let calls = request.calls();

	let outcome = context
		.actions()
		.track(ActionKind::SendTransaction, async {
			let hash = context.send_transaction(chain_id, &calls).await?;
			Ok::<_, WalletError>(ActionSuccess::new(
				hash,
				context.explorer_tx_url(chain_id, &hash),
			))
		})
		.await;
	Ok(Json(outcome))
}

/// POST /api/actions/send-user-operation
///
/// Succeeds with the user-operation hash once the bundler accepted it.
pub async fn handle_send_user_operation(
	State(state): State<AppState>,
	Json(request): Json<CallsRequest>,
) -> Result<Json<ActionState>, ApiError> {
	let context = state.selector.current().await?;
	let chain_id = request.chain_id.unwrap_or(state.config.app.default_chain);
	let calls = request.calls();

	let outcome = context
		.actions()
		.track(ActionKind::SendUserOperation, async {
			let hash = context.send_user_operation(chain_id, &calls).await?;
			Ok::<_, WalletError>(ActionSuccess::new(hash, None))
		})
		.await;
	Ok(Json(outcome))
}

/// POST /api/actions/create-session-key
///
/// Succeeds with the session key's address.
pub async fn handle_create_session_key(
	State(state): State<AppState>,
	Json(request): Json<ChainRequest>,
) -> Result<Json<ActionState>, ApiError> {
	let context = state.selector.current().await?;
	let chain_id = request.chain_id.unwrap_or(state.config.app.default_chain);

	let outcome = context
		.actions()
		.track(ActionKind::CreateSessionKey, async {
			let account = context.create_session_key(chain_id).await?;
			let explorer_url = state
				.config
				.chain(chain_id)
				.and_then(|chain| chain.explorer_address_url(&account.address()));
			Ok::<_, WalletError>(ActionSuccess::new(account.session_key_address(), explorer_url))
		})
		.await;
	Ok(Json(outcome))
}

/// POST /api/actions/send-via-session-key
pub async fn handle_send_via_session_key(
	State(state): State<AppState>,
	Json(request): Json<SessionTransferRequest>,
) -> Result<Json<ActionState>, ApiError> {
	let context = state.selector.current().await?;

	let outcome = context
		.actions()
		.track(ActionKind::SendViaSessionKey, async {
			let hash = context
				.send_via_session_key(request.recipient, request.amount)
				.await?;
			let explorer_url = match context.session_account().await {
				Some(account) => context.explorer_tx_url(account.handle().chain_id(), &hash),
				None => None,
			};
			Ok::<_, WalletError>(ActionSuccess::new(hash, explorer_url))
		})
		.await;
	Ok(Json(outcome))
}

/// POST /api/actions/create-intent-client
///
/// Succeeds with the account address the intent client acts for.
pub async fn handle_create_intent_client(
	State(state): State<AppState>,
) -> Result<Json<ActionState>, ApiError> {
	let context = state.selector.current().await?;

	let outcome = context
		.actions()
		.track(ActionKind::CreateIntentClient, async {
			let client = context.create_intent_client().await?;
			let address = client
				.address()
				.map(|address| address.to_string())
				.unwrap_or_default();
			Ok::<_, WalletError>(ActionSuccess::new(address, None))
		})
		.await;
	Ok(Json(outcome))
}

/// POST /api/actions/send-intent
///
/// Succeeds with the execution transaction on the output chain. Input legs
/// that never opened are logged but do not fail the action.
pub async fn handle_send_intent(
	State(state): State<AppState>,
	Json(request): Json<IntentRequest>,
) -> Result<Json<ActionState>, ApiError> {
	let context = state.selector.current().await?;

	let outcome = context
		.actions()
		.track(ActionKind::SendIntent, async {
			let outcome = context.send_intent(&request).await?;
			if !outcome.all_inputs_opened() {
				tracing::warn!(
					legs = outcome.input_legs.len(),
					"Intent executed with unopened input legs"
				);
			}

			let hash = outcome.execution.receipt.transaction_hash;
			let explorer_url = outcome
				.execution
				.execution_chain_id
				.or(request.output_chain())
				.and_then(|chain_id| context.explorer_tx_url(chain_id, &hash));
			Ok::<_, WalletError>(ActionSuccess::new(hash, explorer_url))
		})
		.await;
	Ok(Json(outcome))
}
