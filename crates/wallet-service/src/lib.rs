//! HTTP surface of the account-abstraction playground.
//!
//! The server owns one [`wallet_core::ProviderSelector`] and exposes provider
//! selection, login, account status, the tracked wallet actions and a faucet
//! proxy under `/api`.

pub mod apis;
pub mod error;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, start_server, AppState};
