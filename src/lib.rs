//! # MQTT Subscription Core
//!
//! The subscription-management core of an MQTT client: a registry of
//! topic-filter subscriptions, wildcard topic matching, and a dispatch
//! pipeline that invokes user callbacks safely while the connection is
//! concurrently modified or torn down.
//!
//! ## Features
//!
//! - **Wildcard Matching**: Full MQTT `+`/`#` semantics plus a literal
//!   mode for administrative lookups, served by one traversal
//! - **Deduplicated Registry**: One record per filter text; duplicate
//!   subscribes update packet identity and callback in place
//! - **All-or-Nothing Batches**: Allocation failure during a batch add
//!   rolls every newly created record back
//! - **Reference-Counted Dispatch**: No record is freed while a
//!   callback is in flight; removal only detaches it from future
//!   matches
//! - **Pluggable Scheduling**: Callbacks run on an external
//!   [`WorkScheduler`]; a tokio-backed implementation is included
//! - **Drain Notifications**: Teardown waits on condition variables
//!   signaled on every reference-count change, never polling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use mqtt_subscription_core::{
//! 	Connection, ConnectionSettings, PublishMessage, SubscriptionRequest,
//! 	TokioScheduler,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! 	let scheduler = Arc::new(TokioScheduler::current());
//! 	let connection =
//! 		Arc::new(Connection::new(scheduler, ConnectionSettings::default()));
//!
//! 	// Register a wildcard subscription.
//! 	connection.subscribe(
//! 		1,
//! 		&[SubscriptionRequest::new(
//! 			"sensors/+/temperature",
//! 			|message: &mqtt_subscription_core::CallbackMessage| {
//! 				println!(
//! 					"{} matched {}: {} bytes",
//! 					message.topic_name,
//! 					message.matched_filter,
//! 					message.payload.len()
//! 				);
//! 			},
//! 		)],
//! 	)?;
//!
//! 	// Fan an incoming publish out to every matching callback.
//! 	let dispatched = connection.dispatch_incoming_publish(
//! 		PublishMessage::new("sensors/kitchen/temperature", &b"21.5"[..]),
//! 	)?;
//! 	assert_eq!(dispatched, 1);
//!
//! 	// Tear down: detach all records, then wait for callbacks to drain.
//! 	connection.disconnect(false);
//! 	connection.await_idle();
//! 	Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

// Core modules
pub mod connection;
pub mod dispatch;
pub mod registry;
pub mod topic;

// === Core Public API ===
// Connection-side state and teardown
pub use connection::{
	Connection, ConnectionId, ConnectionRefs, ConnectionSettings,
};
// Dispatch pipeline and the scheduler seam
pub use dispatch::{
	DispatchError, Dispatcher, PublishMessage, SchedulerError, TokioScheduler,
	WorkItem, WorkScheduler,
};
// Registry types
pub use registry::{
	CallbackMessage, MatchQuery, OutOfMemory, PacketIdentity,
	PacketMatchParams, StoreError, StoreResult, Subscription,
	SubscriptionAlloc, SubscriptionCallback, SubscriptionRequest,
	SubscriptionStore, SystemAlloc, TopicMatchParams,
};
// Topic matching
pub use topic::topic_matches;

// Essential external types
pub use arcstr::ArcStr;
pub use bytes::Bytes;

/// Prelude module for convenient imports
///
/// This module provides the most commonly used types for typical
/// deployments of the subscription core:
///
/// ```rust
/// use mqtt_subscription_core::prelude::*;
/// ```
pub mod prelude {
	//! Essential types for most users of the subscription core

	pub use crate::{
		ArcStr, Bytes, CallbackMessage, Connection, ConnectionSettings,
		DispatchError, PublishMessage, StoreError, SubscriptionRequest,
		TokioScheduler, WorkScheduler,
	};
}

/// Error types used throughout the library
///
/// Re-exports all error types in one convenient location for error
/// handling.
pub mod errors {
	//! All error types used in the library

	pub use crate::dispatch::{DispatchError, SchedulerError};
	pub use crate::registry::{OutOfMemory, StoreError};
	pub use crate::topic::FilterError;
}
