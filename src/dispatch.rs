//! Dispatch module
//!
//! Matches incoming publishes against the registry, pins each matching
//! record for the duration of its callback invocation, and hands the
//! invocations to an external scheduler.

// Submodules
pub mod dispatcher;
pub mod error;
pub mod scheduler;

// Re-export commonly used types for convenience
pub use dispatcher::{Dispatcher, PublishMessage};
pub use error::DispatchError;
pub use scheduler::{SchedulerError, TokioScheduler, WorkItem, WorkScheduler};
