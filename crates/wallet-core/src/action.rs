//! Per-action state tracking.

use crate::{ErrorKind, WalletError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::{PoisonError, RwLock};

/// User-facing actions whose progress is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
	SendTransaction,
	SendUserOperation,
	CreateSessionKey,
	SendViaSessionKey,
	CreateIntentClient,
	SendIntent,
}

impl ActionKind {
	pub const ALL: [ActionKind; 6] = [
		ActionKind::SendTransaction,
		ActionKind::SendUserOperation,
		ActionKind::CreateSessionKey,
		ActionKind::SendViaSessionKey,
		ActionKind::CreateIntentClient,
		ActionKind::SendIntent,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			ActionKind::SendTransaction => "send-transaction",
			ActionKind::SendUserOperation => "send-user-operation",
			ActionKind::CreateSessionKey => "create-session-key",
			ActionKind::SendViaSessionKey => "send-via-session-key",
			ActionKind::CreateIntentClient => "create-intent-client",
			ActionKind::SendIntent => "send-intent",
		}
	}
}

impl fmt::Display for ActionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// What a finished action produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionSuccess {
	/// Transaction or operation hash; setup actions report the resulting address.
	pub hash: String,
	pub explorer_url: Option<String>,
}

impl ActionSuccess {
	pub fn new(hash: impl ToString, explorer_url: Option<String>) -> Self {
		Self {
			hash: hash.to_string(),
			explorer_url,
		}
	}
}

/// Lifecycle of one action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ActionState {
	#[default]
	Idle,
	Pending,
	Success {
		hash: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		explorer_url: Option<String>,
	},
	Error {
		kind: ErrorKind,
		message: String,
	},
}

/// Latest state of every action of one provider context.
#[derive(Debug, Default)]
pub struct ActionTracker {
	states: RwLock<BTreeMap<ActionKind, ActionState>>,
}

impl ActionTracker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Runs `action`, recording `Pending` first and its outcome after.
	///
	/// If the returned future is dropped before `action` finishes, the
	/// action is recorded as an inconclusive error rather than left pending.
	pub async fn track<F>(&self, kind: ActionKind, action: F) -> ActionState
	where
		F: Future<Output = Result<ActionSuccess, WalletError>>,
	{
		self.set(kind, ActionState::Pending);
		let mut guard = PendingGuard {
			tracker: self,
			kind,
			settled: false,
		};

		let state = match action.await {
			Ok(success) => {
				tracing::info!(action = %kind, hash = %success.hash, "Action succeeded");
				ActionState::Success {
					hash: success.hash,
					explorer_url: success.explorer_url,
				}
			},
			Err(e) => {
				tracing::warn!(action = %kind, error = %e, "Action failed");
				ActionState::Error {
					kind: e.kind(),
					message: e.to_string(),
				}
			},
		};

		guard.settled = true;
		self.set(kind, state.clone());
		state
	}

	pub fn get(&self, kind: ActionKind) -> ActionState {
		self.states
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(&kind)
			.cloned()
			.unwrap_or_default()
	}

	/// State of every action, idle ones included.
	pub fn snapshot(&self) -> BTreeMap<ActionKind, ActionState> {
		let states = self.states.read().unwrap_or_else(PoisonError::into_inner);
		ActionKind::ALL
			.into_iter()
			.map(|kind| (kind, states.get(&kind).cloned().unwrap_or_default()))
			.collect()
	}

	fn set(&self, kind: ActionKind, state: ActionState) {
		self.states
			.write()
			.unwrap_or_else(PoisonError::into_inner)
			.insert(kind, state);
	}
}

/// Settles a tracked action whose future was dropped mid-flight.
struct PendingGuard<'a> {
	tracker: &'a ActionTracker,
	kind: ActionKind,
	settled: bool,
}

impl Drop for PendingGuard<'_> {
	fn drop(&mut self) {
		if self.settled {
			return;
		}
		tracing::warn!(action = %self.kind, "Action abandoned before completion");
		self.tracker.set(
			self.kind,
			ActionState::Error {
				kind: ErrorKind::Inconclusive,
				message: "Action was interrupted before its outcome was known".into(),
			},
		);
	}
}
