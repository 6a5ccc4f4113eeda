//! Error types for publish dispatch.

use thiserror::Error;

use super::scheduler::SchedulerError;

/// Errors reported while dispatching an incoming publish.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
	/// The external scheduler declined at least one callback hand-off.
	/// The reference counts taken for the affected matches were rolled
	/// back; other matches were still dispatched.
	#[error("scheduler rejected callback dispatch: {0}")]
	SchedulerRejected(#[from] SchedulerError),
}

impl DispatchError {
	/// Returns the error type for categorization
	pub fn error_type(&self) -> &'static str {
		match self {
			| DispatchError::SchedulerRejected(_) => "scheduler_rejected",
		}
	}
}
