//! Error types for the subscription registry.

use thiserror::Error;

use super::alloc::OutOfMemory;

/// Errors reported by the subscription store.
///
/// Removal and lookup never fail; a removal with nothing to remove is a
/// successful no-op.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
	/// Record allocation failed while adding subscriptions. Every
	/// record created by the failing batch has been rolled back.
	#[error("subscription allocation failed: {0}")]
	OutOfMemory(#[from] OutOfMemory),
}

impl StoreError {
	/// Returns the error type for categorization
	pub fn error_type(&self) -> &'static str {
		match self {
			| StoreError::OutOfMemory(_) => "out_of_memory",
		}
	}
}

/// Convenient Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
