//! Registry trait for pluggable implementations.
//!
//! Backends (signers, storage) expose a unit `Registry` struct implementing
//! this trait so that factories can be discovered by name from configuration.

/// Trait implemented by every self-registering implementation.
pub trait ImplementationRegistry {
	/// Name used to select the implementation in configuration.
	const NAME: &'static str;

	/// Factory function type produced by the implementation.
	type Factory;

	/// Returns the factory that builds the implementation.
	fn factory() -> Self::Factory;
}
