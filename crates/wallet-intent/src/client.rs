//! Sending intents and tracking their legs.

use crate::installer::{install_intent_modules, install_order, IntentModules};
use crate::{IntentError, IntentInterface};
use alloy_primitives::{Address, Bytes, B256};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::instrument;
use wallet_delivery::{poll_until, PollOutcome, PollPolicy};
use wallet_smart_account::TransactionClient;
use wallet_types::{
	truncate_id, CabBalance, CabRequest, ExecutionReceipt, InputLegReport, IntentOutcome,
	IntentRequest, IntentSubmission, LegStatus, SignedIntent, UiHash,
};

/// Intent-capable view over one account on several chains.
///
/// Every chain in `clients` has the intent modules installed by the time
/// [`IntentClient::connect`] returns.
#[derive(Clone)]
pub struct IntentClient {
	service: Arc<dyn IntentInterface>,
	clients: BTreeMap<u64, TransactionClient>,
	output_chain: u64,
	receipt_policy: PollPolicy,
}

impl IntentClient {
	pub fn new(
		service: Arc<dyn IntentInterface>,
		clients: BTreeMap<u64, TransactionClient>,
		output_chain: u64,
		receipt_policy: PollPolicy,
	) -> Self {
		Self {
			service,
			clients,
			output_chain,
			receipt_policy,
		}
	}

	/// Installs `executor` on every input chain, then on the output chain,
	/// and returns a client for the whole set.
	///
	/// Any failed chain aborts with [`IntentError::PartialInstallation`];
	/// calling again repeats the full sequence.
	#[instrument(skip_all, fields(output_chain = output_chain, executor = %modules.executor))]
	pub async fn connect(
		service: Arc<dyn IntentInterface>,
		clients: BTreeMap<u64, TransactionClient>,
		input_chains: &[u64],
		output_chain: u64,
		modules: IntentModules,
		receipt_policy: PollPolicy,
	) -> Result<Self, IntentError> {
		let order = install_order(input_chains, output_chain);
		let installed = install_intent_modules(&clients, &order, &modules).await?;
		tracing::info!(chains = ?installed, "Intent client ready");
		Ok(Self::new(service, clients, output_chain, receipt_policy))
	}

	/// Root account address shared by all chains.
	pub fn address(&self) -> Option<Address> {
		self.root().ok().map(|client| client.account().address())
	}

	/// Chains this client can act on, ascending.
	pub fn chain_ids(&self) -> Vec<u64> {
		self.clients.keys().copied().collect()
	}

	pub fn output_chain(&self) -> u64 {
		self.output_chain
	}

	fn root(&self) -> Result<&TransactionClient, IntentError> {
		self.clients.get(&self.output_chain).ok_or_else(|| {
			IntentError::PrerequisiteMissing(format!(
				"root account on chain {}",
				self.output_chain
			))
		})
	}

	/// Sends `request` and follows it to its execution on the output chain.
	///
	/// Input legs are awaited concurrently and reported one by one; a failed
	/// leg does not stop the others nor the wait for execution.
	#[instrument(skip_all, fields(output_chain = self.output_chain))]
	pub async fn send_intent(&self, request: &IntentRequest) -> Result<IntentOutcome, IntentError> {
		let submission = self.submit(request).await?;

		let input_legs = join_all(
			submission
				.inputs_ui_hash
				.iter()
				.map(|leg| self.wait_for_open_receipt(*leg)),
		)
		.await;
		for leg in &input_legs {
			match &leg.status {
				LegStatus::Opened { transaction_hash } => tracing::info!(
					chain_id = ?leg.chain_id,
					tx_hash = %truncate_id(&transaction_hash.to_string()),
					"Intent opened"
				),
				LegStatus::Failed { message } => tracing::warn!(
					chain_id = ?leg.chain_id,
					ui_hash = %truncate_id(&leg.ui_hash.to_string()),
					%message,
					"Intent leg did not open"
				),
			}
		}

		let execution = self
			.wait_for_execution_receipt(submission.output_ui_hash.ui_hash)
			.await?;
		tracing::info!(
			chain_id = ?execution.execution_chain_id,
			tx_hash = %truncate_id(&execution.receipt.transaction_hash.to_string()),
			"Intent executed"
		);

		Ok(IntentOutcome {
			submission,
			input_legs,
			execution,
		})
	}

	/// Quotes, signs and submits `request` without waiting for any leg.
	pub async fn submit(&self, request: &IntentRequest) -> Result<IntentSubmission, IntentError> {
		let root = self.root()?;
		if request.output_tokens.is_empty() {
			return Err(IntentError::PrerequisiteMissing("intent output token".into()));
		}

		let quote = self
			.service
			.get_intent(root.account().address(), request)
			.await?;

		let signer = root.account().signer();
		let mut signatures = Vec::with_capacity(quote.orders.len());
		for order in &quote.orders {
			let signature = signer.sign_message(order.order_hash.as_slice()).await?;
			signatures.push(Bytes::from(signature.as_bytes().to_vec()));
		}

		self.service
			.send_user_intent(&SignedIntent {
				intent: quote,
				signatures,
			})
			.await
	}

	/// Waits for an input leg to open. Never fails; problems land in the report.
	pub async fn wait_for_open_receipt(&self, leg: UiHash) -> InputLegReport {
		let service = self.service.clone();
		let outcome = poll_until(&self.receipt_policy, |_| {
			let service = service.clone();
			async move { service.get_open_receipt(leg.ui_hash).await }
		})
		.await;

		let status = match outcome {
			Ok(PollOutcome::Ready { value, .. }) => LegStatus::Opened {
				transaction_hash: value.transaction_hash,
			},
			Ok(PollOutcome::Inconclusive { attempts }) => LegStatus::Failed {
				message: IntentError::Inconclusive { attempts }.to_string(),
			},
			Err(e) => LegStatus::Failed {
				message: e.to_string(),
			},
		};
		InputLegReport {
			ui_hash: leg.ui_hash,
			chain_id: leg.chain_id,
			status,
		}
	}

	/// Waits for the output leg to execute.
	pub async fn wait_for_execution_receipt(
		&self,
		ui_hash: B256,
	) -> Result<ExecutionReceipt, IntentError> {
		let service = self.service.clone();
		let outcome = poll_until(&self.receipt_policy, |_| {
			let service = service.clone();
			async move { service.get_execution_receipt(ui_hash).await }
		})
		.await?;

		match outcome {
			PollOutcome::Ready { value, .. } => Ok(value),
			PollOutcome::Inconclusive { attempts } => Err(IntentError::Inconclusive { attempts }),
		}
	}

	/// Balance of `token_tickers` aggregated over `networks`.
	pub async fn get_cab(
		&self,
		networks: Vec<u64>,
		token_tickers: Vec<String>,
	) -> Result<CabBalance, IntentError> {
		let address = self.root()?.account().address();
		self.service
			.get_cab(&CabRequest {
				address,
				networks,
				token_tickers,
			})
			.await
	}
}
