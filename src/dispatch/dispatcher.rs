//! Match, pin, schedule, unpin: the incoming-publish pipeline.

#![allow(clippy::missing_docs_in_private_items)]

use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use bytes::Bytes;
use tracing::{trace, warn};

use super::error::DispatchError;
use super::scheduler::{SchedulerError, WorkScheduler};
use crate::connection::{ConnectionId, ConnectionRefs};
use crate::registry::store::SubscriptionStore;
use crate::registry::subscription::{CallbackMessage, Subscription};

/// An incoming published message to be matched against the registry.
#[derive(Debug, Clone)]
pub struct PublishMessage {
	/// Topic name the message was published to.
	pub topic_name: ArcStr,
	/// Application payload.
	pub payload: Bytes,
}

impl PublishMessage {
	/// Creates a publish from a topic name and payload.
	pub fn new(topic_name: impl Into<ArcStr>, payload: impl Into<Bytes>) -> Self {
		Self {
			topic_name: topic_name.into(),
			payload: payload.into(),
		}
	}
}

/// Pins one subscription record and the connection for one in-flight
/// callback invocation.
///
/// Construction increments both counters before the work item is
/// handed off; dropping the guard decrements them again, after the
/// callback returns or when a rejected work item is discarded. The
/// symmetric rollback on scheduler rejection therefore needs no
/// separate code path.
pub(crate) struct DispatchGuard {
	record: Arc<Subscription>,
	references: Arc<ConnectionRefs>,
}

impl DispatchGuard {
	pub(crate) fn pin(
		record: Arc<Subscription>,
		references: Arc<ConnectionRefs>,
	) -> Self {
		record.pin();
		references.increment();
		Self { record, references }
	}
}

impl Drop for DispatchGuard {
	fn drop(&mut self) {
		self.record.unpin();
		self.references.decrement();
	}
}

/// Fans an incoming publish out to every matching subscription.
pub struct Dispatcher {
	scheduler: Arc<dyn WorkScheduler>,
	dispatch_delay: Duration,
}

impl Dispatcher {
	/// Creates a dispatcher handing work to the given scheduler with a
	/// fixed per-item delay.
	pub fn new(scheduler: Arc<dyn WorkScheduler>, dispatch_delay: Duration) -> Self {
		Self {
			scheduler,
			dispatch_delay,
		}
	}

	/// Dispatches one publish: finds all matching records, pins each,
	/// and hands one callback invocation per match to the scheduler.
	///
	/// Matches are independent: a rejected hand-off rolls back only its
	/// own reference counts and the remaining matches are still
	/// dispatched. Returns the number of invocations handed off, or the
	/// first scheduler rejection.
	pub fn dispatch(
		&self,
		connection: ConnectionId,
		store: &SubscriptionStore,
		references: &Arc<ConnectionRefs>,
		publish: &PublishMessage,
	) -> Result<usize, DispatchError> {
		let matched = store.collect_matches(&publish.topic_name);
		if matched.is_empty() {
			trace!(topic = %publish.topic_name, "No subscription matched incoming publish");
			return Ok(0);
		}

		let mut dispatched = 0_usize;
		let mut first_rejection: Option<SchedulerError> = None;

		for (record, callback, matched_filter) in matched {
			let guard =
				DispatchGuard::pin(Arc::clone(&record), Arc::clone(references));
			let message = CallbackMessage {
				connection,
				topic_name: publish.topic_name.clone(),
				matched_filter,
				payload: publish.payload.clone(),
			};
			let work = Box::new(move || {
				// Owning the guard keeps the record and the connection
				// pinned until the callback has returned.
				let _guard = guard;
				callback.invoke(&message);
			});

			match self.scheduler.schedule_work(work, self.dispatch_delay) {
				| Ok(()) => dispatched += 1,
				| Err(err) => {
					warn!(
						topic = %publish.topic_name,
						topic_filter = %record.topic_filter(),
						error = %err,
						"Scheduler rejected callback dispatch"
					);
					if first_rejection.is_none() {
						first_rejection = Some(err);
					}
				}
			}
		}

		match first_rejection {
			| Some(err) => Err(DispatchError::SchedulerRejected(err)),
			| None => Ok(dispatched),
		}
	}
}
