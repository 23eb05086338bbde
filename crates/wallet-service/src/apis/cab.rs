//! Chain-abstracted balance of the signed-in account.

use crate::{error::ApiError, server::AppState};
use axum::{extract::State, Json};
use wallet_types::CabBalance;

/// GET /api/cab
///
/// Requires an intent client created through the actions API.
pub async fn handle_get_cab(State(state): State<AppState>) -> Result<Json<CabBalance>, ApiError> {
	let context = state.selector.current().await?;
	Ok(Json(context.get_cab().await?))
}
