//! Error responses of the HTTP API.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wallet_core::{ErrorKind, WalletError};

/// Errors returned by API handlers.
#[derive(Debug, Error)]
pub enum ApiError {
	#[error("{0}")]
	BadRequest(String),
	/// A wallet operation failed outside the action tracker.
	#[error(transparent)]
	Wallet(#[from] WalletError),
	/// An upstream HTTP service failed.
	#[error("Upstream error: {0}")]
	Upstream(String),
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ApiError {
	fn status_and_code(&self) -> (StatusCode, String) {
		match self {
			ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request".to_string()),
			ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream".to_string()),
			ApiError::Wallet(e) => {
				let kind = e.kind();
				let status = match kind {
					ErrorKind::PrerequisiteMissing | ErrorKind::Unsupported => {
						StatusCode::BAD_REQUEST
					},
					ErrorKind::PolicyViolation | ErrorKind::Deserialization => {
						StatusCode::UNPROCESSABLE_ENTITY
					},
					ErrorKind::RemoteRejection => StatusCode::BAD_GATEWAY,
					ErrorKind::Inconclusive => StatusCode::GATEWAY_TIMEOUT,
					ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
				};
				(status, kind_code(kind))
			},
		}
	}
}

fn kind_code(kind: ErrorKind) -> String {
	serde_json::to_value(kind)
		.ok()
		.and_then(|v| v.as_str().map(str::to_string))
		.unwrap_or_else(|| "internal".to_string())
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let (status, error) = self.status_and_code();
		if status.is_server_error() {
			tracing::error!(error = %self, "API request failed");
		} else {
			tracing::warn!(error = %self, "API request rejected");
		}

		let body = ErrorResponse {
			error,
			message: self.to_string(),
		};
		(status, Json(body)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::to_bytes;

	#[tokio::test]
	async fn test_wallet_error_response() {
		let error = ApiError::from(WalletError::PrerequisiteMissing("signed-in wallet".into()));
		let response = error.into_response();
		assert_eq!(response.status(), StatusCode::BAD_REQUEST);

		let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let body: ErrorResponse = serde_json::from_slice(&body).unwrap();
		assert_eq!(body.error, "prerequisite_missing");
		assert_eq!(body.message, "Missing prerequisite: signed-in wallet");
	}

	#[test]
	fn test_upstream_is_bad_gateway() {
		let response = ApiError::Upstream("faucet unreachable".into()).into_response();
		assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	}
}
