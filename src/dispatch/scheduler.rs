//! The external worker-pool seam executing subscription callbacks.

use std::time::Duration;

use thiserror::Error;
use tokio::runtime::Handle;

/// A unit of callback work handed to the scheduler.
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Errors an external scheduler may report when refusing work.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
	/// The scheduler is shutting down and accepts no further work.
	#[error("scheduler is shut down")]
	Shutdown,

	/// The scheduler's queue or thread budget is exhausted.
	#[error("scheduler is at capacity")]
	AtCapacity,
}

impl SchedulerError {
	/// Returns the error type for categorization
	pub fn error_type(&self) -> &'static str {
		match self {
			| SchedulerError::Shutdown => "shutdown",
			| SchedulerError::AtCapacity => "at_capacity",
		}
	}
}

/// Hands units of callback work to worker threads.
///
/// Implementations must run each accepted work item exactly once and
/// must not run it inline on the calling thread: a subscription
/// callback is free to block on external synchronization for an
/// application-defined period, and the dispatching thread only ever
/// executes short, non-blocking sections.
pub trait WorkScheduler: Send + Sync {
	/// Schedules one work item, optionally after a delay. A rejected
	/// item is dropped by the implementation without running it.
	fn schedule_work(
		&self,
		work: WorkItem,
		delay: Duration,
	) -> Result<(), SchedulerError>;
}

/// [`WorkScheduler`] backed by the tokio blocking pool.
///
/// Work runs via [`Handle::spawn_blocking`] rather than as async tasks
/// so callbacks may block without starving the runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
	handle: Handle,
}

impl TokioScheduler {
	/// Creates a scheduler for the given runtime handle.
	pub fn new(handle: Handle) -> Self {
		Self { handle }
	}

	/// Creates a scheduler for the current tokio runtime.
	///
	/// # Panics
	///
	/// Panics when called outside a tokio runtime, like
	/// [`Handle::current`].
	pub fn current() -> Self {
		Self::new(Handle::current())
	}
}

impl WorkScheduler for TokioScheduler {
	fn schedule_work(
		&self,
		work: WorkItem,
		delay: Duration,
	) -> Result<(), SchedulerError> {
		if delay.is_zero() {
			self.handle.spawn_blocking(work);
		} else {
			let handle = self.handle.clone();
			self.handle.spawn(async move {
				tokio::time::sleep(delay).await;
				handle.spawn_blocking(work);
			});
		}
		Ok(())
	}
}
