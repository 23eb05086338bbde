//! Selection of the active wallet-credential provider.
//!
//! Switching provider replaces the whole [`ProviderContext`]; nothing built
//! for one provider is reused by another. An unknown provider id leaves the
//! selector without any context until a valid one is selected.

use crate::context::ProviderContext;
use crate::{WalletError, WalletServices};
use std::sync::Arc;
use tokio::sync::RwLock;
use wallet_types::ProviderKind;

/// Outcome of parsing a provider id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSelection {
	Valid(ProviderKind),
	/// Carries the user-facing rejection message.
	Invalid(String),
}

impl ProviderSelection {
	pub fn parse(id: &str) -> Self {
		match id.parse::<ProviderKind>() {
			Ok(kind) => Self::Valid(kind),
			Err(e) => Self::Invalid(e.to_string()),
		}
	}

	pub fn is_valid(&self) -> bool {
		matches!(self, Self::Valid(_))
	}
}

struct SelectorState {
	selection: ProviderSelection,
	context: Option<Arc<ProviderContext>>,
}

/// Holds the selected provider and the context built for it.
pub struct ProviderSelector {
	services: WalletServices,
	state: RwLock<SelectorState>,
}

impl ProviderSelector {
	pub fn new(services: WalletServices, initial: &str) -> Self {
		let selection = ProviderSelection::parse(initial);
		let context = match &selection {
			ProviderSelection::Valid(kind) => {
				Some(Arc::new(ProviderContext::new(*kind, services.clone())))
			},
			ProviderSelection::Invalid(_) => None,
		};

		Self {
			services,
			state: RwLock::new(SelectorState { selection, context }),
		}
	}

	/// Selects the provider named `id`.
	///
	/// Selecting the provider already in use keeps its context.
	pub async fn select(&self, id: &str) -> ProviderSelection {
		let selection = ProviderSelection::parse(id);

		let context = match &selection {
			ProviderSelection::Valid(kind) => {
				let kind = *kind;
				let unchanged = matches!(
					&self.state.read().await.context,
					Some(current) if current.provider() == kind
				);
				if unchanged {
					return selection;
				}
				tracing::info!(provider = %kind, "Selected account provider");
				Some(Arc::new(ProviderContext::new(kind, self.services.clone())))
			},
			ProviderSelection::Invalid(message) => {
				tracing::warn!(provider = id, "{}", message);
				None
			},
		};

		let mut state = self.state.write().await;
		state.selection = selection.clone();
		state.context = context;
		selection
	}

	pub async fn selection(&self) -> ProviderSelection {
		self.state.read().await.selection.clone()
	}

	/// Context of the selected provider.
	pub async fn current(&self) -> Result<Arc<ProviderContext>, WalletError> {
		let state = self.state.read().await;
		match (&state.selection, &state.context) {
			(ProviderSelection::Valid(_), Some(context)) => Ok(context.clone()),
			(ProviderSelection::Invalid(message), _) => {
				Err(WalletError::Unsupported(message.clone()))
			},
			(ProviderSelection::Valid(kind), None) => Err(WalletError::PrerequisiteMissing(format!(
				"{} provider context",
				kind
			))),
		}
	}
}
