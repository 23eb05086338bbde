//! Cross-chain intent types.
//!
//! An intent is one logical operation split into input legs (source chains)
//! and an output leg (destination chain). The intent service returns one
//! `uiHash` per leg; each hash resolves to a receipt by polling.

use crate::{BundleReceipt, Call};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Token amount on a specific chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
	pub chain_id: u64,
	pub address: Address,
	/// Omitted on input tokens to let the service pick the amount.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub amount: Option<U256>,
}

/// One cross-chain logical operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
	/// Calls executed on the destination chain.
	#[serde(default)]
	pub calls: Vec<Call>,
	#[serde(default)]
	pub input_tokens: Vec<TokenAmount>,
	pub output_tokens: Vec<TokenAmount>,
}

impl IntentRequest {
	/// Distinct source chains in ascending order.
	pub fn input_chains(&self) -> Vec<u64> {
		self.input_tokens
			.iter()
			.map(|t| t.chain_id)
			.collect::<BTreeSet<_>>()
			.into_iter()
			.collect()
	}

	/// Destination chain, taken from the first output token.
	pub fn output_chain(&self) -> Option<u64> {
		self.output_tokens.first().map(|t| t.chain_id)
	}
}

/// Intent request as sent to the intent service, bound to an account.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentQuoteRequest<'a> {
	pub sender: Address,
	pub calls: &'a [Call],
	pub input_tokens: &'a [TokenAmount],
	pub output_tokens: &'a [TokenAmount],
}

/// Order the account must sign before the intent is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentOrder {
	pub chain_id: u64,
	pub order_hash: B256,
}

/// Quote returned by `ui_getIntent`.
///
/// Fields other than `orders` are opaque and sent back unchanged on submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentQuote {
	pub orders: Vec<IntentOrder>,
	#[serde(flatten)]
	pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Signed quote submitted through `ui_sendUserIntent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedIntent {
	pub intent: IntentQuote,
	pub signatures: Vec<Bytes>,
}

/// Hash identifying one leg of an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiHash {
	pub ui_hash: B256,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub chain_id: Option<u64>,
}

/// Leg hashes returned by `ui_sendUserIntent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentSubmission {
	pub inputs_ui_hash: Vec<UiHash>,
	pub output_ui_hash: UiHash,
}

/// Receipt observed once an input leg is opened on its source chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenReceipt {
	#[serde(default)]
	pub open_chain_id: Option<u64>,
	pub transaction_hash: B256,
}

/// Receipt observed once the output leg executed on the destination chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReceipt {
	#[serde(default)]
	pub execution_chain_id: Option<u64>,
	pub receipt: BundleReceipt,
}

/// Status of one input leg after the open wait completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LegStatus {
	Opened { transaction_hash: B256 },
	Failed { message: String },
}

/// Independent report for one input leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputLegReport {
	pub ui_hash: B256,
	pub chain_id: Option<u64>,
	#[serde(flatten)]
	pub status: LegStatus,
}

/// Final outcome of a sent intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentOutcome {
	pub submission: IntentSubmission,
	pub input_legs: Vec<InputLegReport>,
	pub execution: ExecutionReceipt,
}

impl IntentOutcome {
	/// Whether every input leg was observed as opened.
	pub fn all_inputs_opened(&self) -> bool {
		self.input_legs
			.iter()
			.all(|leg| matches!(leg.status, LegStatus::Opened { .. }))
	}
}

/// Chain-abstracted balance query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CabRequest {
	pub address: Address,
	pub networks: Vec<u64>,
	pub token_tickers: Vec<String>,
}

/// Per-chain component of a chain-abstracted balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CabBreakdown {
	pub chain_id: u64,
	pub address: Address,
	pub amount: U256,
}

/// Chain-abstracted balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CabBalance {
	#[serde(default)]
	pub token_ticker: Option<String>,
	pub amount: U256,
	#[serde(default)]
	pub decimals: Option<u8>,
	#[serde(default)]
	pub breakdown: Vec<CabBreakdown>,
}
