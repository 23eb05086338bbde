//! Common types module for the account-abstraction playground.
//!
//! This crate defines the data types shared by every other crate in the
//! workspace: network descriptions, calls and authorization grants, ERC-4337
//! user operations and receipts, cross-chain intents, provider identifiers
//! and the configuration validation framework.

/// Call and authorization grant types.
pub mod account;
/// User operation receipts and bundler/paymaster payloads.
pub mod delivery;
/// Cross-chain intent request and receipt types.
pub mod intent;
/// JSON-RPC 2.0 request and response envelopes.
pub mod jsonrpc;
/// Network and token configuration types.
pub mod networks;
/// Wallet provider identifiers and embedded wallet projection.
pub mod provider;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Storage namespaces used by persisted state.
pub mod storage;
/// ERC-4337 v0.7 user operation type and hashing.
pub mod user_operation;
/// Utility functions for common formatting.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

pub use account::*;
pub use delivery::*;
pub use intent::*;
pub use jsonrpc::{JsonRpcErrorObject, JsonRpcRequest, JsonRpcResponse};
pub use networks::{deserialize_networks, ChainConfig, NetworksConfig, RpcEndpoint, TokenConfig};
pub use provider::{EmbeddedWallet, ProviderKind, ProviderParseError};
pub use registry::ImplementationRegistry;
pub use storage::StorageKey;
pub use user_operation::{Eip7702Auth, UserOperation};
pub use utils::{truncate_id, with_0x_prefix, without_0x_prefix};
pub use validation::{validate_private_key, ConfigSchema, Field, FieldType, Schema, ValidationError};
