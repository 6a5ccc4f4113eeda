//! Connection-side ownership of the subscription core.
//!
//! A [`Connection`] owns the subscription store, the aggregate
//! reference counter gating physical teardown, and the queue of
//! pending incoming publishes, and wires them to the dispatch
//! pipeline.

#![allow(clippy::missing_docs_in_private_items)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use arcstr::ArcStr;
use tracing::{debug, info, warn};

use crate::dispatch::dispatcher::{Dispatcher, PublishMessage};
use crate::dispatch::error::DispatchError;
use crate::dispatch::scheduler::WorkScheduler;
use crate::registry::error::StoreResult;
use crate::registry::store::{MatchQuery, SubscriptionStore};
use crate::registry::subscription::{Subscription, SubscriptionRequest};

/// Process-unique identifier of a connection.
///
/// Delivered to callbacks as the back-reference identifying which
/// connection dispatched the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
	pub(crate) fn next() -> Self {
		static NEXT: AtomicU64 = AtomicU64::new(0);
		Self(NEXT.fetch_add(1, Ordering::Relaxed))
	}
}

/// Aggregate count of in-flight callback invocations on a connection.
///
/// Incremented once per dispatched callback in addition to the
/// per-subscription count, so the connection itself cannot be torn
/// down while any callback is outstanding. The condition variable is
/// signaled on every change, so waiters never poll.
pub struct ConnectionRefs {
	count: Mutex<i32>,
	count_changed: Condvar,
}

impl ConnectionRefs {
	/// Creates a counter with no invocations in flight.
	pub fn new() -> Self {
		Self {
			count: Mutex::new(0),
			count_changed: Condvar::new(),
		}
	}

	pub(crate) fn increment(&self) {
		{
			let mut count = self.count.lock().unwrap();
			*count += 1;
		}
		self.count_changed.notify_all();
	}

	pub(crate) fn decrement(&self) {
		{
			let mut count = self.count.lock().unwrap();
			*count -= 1;
			debug_assert!(*count >= 0);
		}
		self.count_changed.notify_all();
	}

	/// Current number of in-flight callback invocations.
	pub fn current(&self) -> i32 {
		*self.count.lock().unwrap()
	}

	/// Blocks until the count equals `target` or the timeout elapses;
	/// returns whether the target was observed.
	pub fn wait_for(&self, target: i32, timeout: Duration) -> bool {
		let count = self.count.lock().unwrap();
		let (count, _timeout_result) = self
			.count_changed
			.wait_timeout_while(count, timeout, |count| *count != target)
			.unwrap();
		*count == target
	}
}

impl Default for ConnectionRefs {
	fn default() -> Self {
		Self::new()
	}
}

/// Connection-level tuning knobs.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
	/// Delay handed to the scheduler with every callback work item.
	pub dispatch_delay: Duration,
	/// Timeout used by [`Connection::await_idle`].
	pub drain_timeout: Duration,
}

impl Default for ConnectionSettings {
	fn default() -> Self {
		Self {
			dispatch_delay: Duration::ZERO,
			drain_timeout: Duration::from_secs(5),
		}
	}
}

/// One MQTT connection's subscription state.
///
/// Owns the store, the aggregate reference counter and the pending
/// publish queue; subscription and dispatch calls may race freely with
/// each other and with teardown.
pub struct Connection {
	id: ConnectionId,
	store: SubscriptionStore,
	references: Arc<ConnectionRefs>,
	pending: Mutex<VecDeque<PublishMessage>>,
	dispatcher: Dispatcher,
	settings: ConnectionSettings,
}

impl Connection {
	/// Creates a connection dispatching callbacks through the given
	/// scheduler.
	pub fn new(
		scheduler: Arc<dyn WorkScheduler>,
		settings: ConnectionSettings,
	) -> Self {
		Self::with_store(SubscriptionStore::new(), scheduler, settings)
	}

	/// Creates a connection around a prepared store, e.g. one with a
	/// custom allocation policy.
	pub fn with_store(
		store: SubscriptionStore,
		scheduler: Arc<dyn WorkScheduler>,
		settings: ConnectionSettings,
	) -> Self {
		let dispatcher = Dispatcher::new(scheduler, settings.dispatch_delay);
		Self {
			id: ConnectionId::next(),
			store,
			references: Arc::new(ConnectionRefs::new()),
			pending: Mutex::new(VecDeque::new()),
			dispatcher,
			settings,
		}
	}

	/// This connection's identifier.
	pub fn id(&self) -> ConnectionId {
		self.id
	}

	/// The underlying subscription store.
	pub fn store(&self) -> &SubscriptionStore {
		&self.store
	}

	/// The aggregate reference counter.
	pub fn references(&self) -> &ConnectionRefs {
		&self.references
	}

	/// Registers a batch of subscriptions; see
	/// [`SubscriptionStore::add_subscriptions`].
	pub fn subscribe(
		&self,
		packet_identifier: u16,
		requests: &[SubscriptionRequest],
	) -> StoreResult<()> {
		self.store.add_subscriptions(packet_identifier, requests)
	}

	/// Removes subscriptions by packet identity; see
	/// [`SubscriptionStore::remove_by_packet`].
	pub fn unsubscribe_by_packet(
		&self,
		packet_identifier: u16,
		order: Option<usize>,
	) {
		self.store.remove_by_packet(packet_identifier, order);
	}

	/// Removes subscriptions by literal filter text; see
	/// [`SubscriptionStore::remove_by_topic_filter`].
	pub fn unsubscribe_by_filters(&self, filters: &[ArcStr]) {
		self.store.remove_by_topic_filter(filters);
	}

	/// Returns the first record satisfying the query; used internally
	/// and by diagnostics.
	pub fn find_first_match(
		&self,
		query: &MatchQuery<'_>,
	) -> Option<Arc<Subscription>> {
		self.store.find_first_match(query)
	}

	/// Number of live subscription records.
	pub fn subscription_count(&self) -> usize {
		self.store.len()
	}

	/// Dispatches one incoming publish to every matching subscription.
	pub fn dispatch_incoming_publish(
		&self,
		publish: PublishMessage,
	) -> Result<usize, DispatchError> {
		self.dispatcher
			.dispatch(self.id, &self.store, &self.references, &publish)
	}

	/// Queues an incoming publish for a later [`Self::dispatch_pending`].
	pub fn enqueue_incoming_publish(&self, publish: PublishMessage) {
		let mut pending = self.pending.lock().unwrap();
		pending.push_back(publish);
		debug!(queued = pending.len(), "Queued incoming publish");
	}

	/// Dispatches all queued publishes in FIFO order.
	///
	/// A failed dispatch does not stop the drain; the first error is
	/// reported after the queue is empty. Returns the total number of
	/// callback invocations handed off.
	pub fn dispatch_pending(&self) -> Result<usize, DispatchError> {
		let mut dispatched = 0_usize;
		let mut first_error: Option<DispatchError> = None;

		loop {
			// The queue lock is not held across dispatch so callbacks
			// queued concurrently are picked up too.
			let publish = self.pending.lock().unwrap().pop_front();
			let Some(publish) = publish else { break };

			match self.dispatch_incoming_publish(publish) {
				| Ok(count) => dispatched += count,
				| Err(err) => {
					if first_error.is_none() {
						first_error = Some(err);
					}
				}
			}
		}

		match first_error {
			| Some(err) => Err(err),
			| None => Ok(dispatched),
		}
	}

	/// Current number of in-flight callback invocations.
	pub fn reference_count(&self) -> i32 {
		self.references.current()
	}

	/// Blocks until the aggregate count equals `target` or the timeout
	/// elapses; returns whether the target was observed.
	pub fn wait_for_references(&self, target: i32, timeout: Duration) -> bool {
		self.references.wait_for(target, timeout)
	}

	/// Blocks until no callback is in flight, up to the configured
	/// drain timeout; returns whether the connection went idle.
	pub fn await_idle(&self) -> bool {
		self.references.wait_for(0, self.settings.drain_timeout)
	}

	/// Tears down the subscription state.
	///
	/// With `cleanup_only` the pending publish queue is discarded;
	/// otherwise it is drained and dispatched first. Every record is
	/// then removed — records pinned by in-flight callbacks stay
	/// allocated until they drain. The caller gates physical teardown
	/// on [`Self::wait_for_references`] or [`Self::await_idle`]; this
	/// call never blocks on callbacks.
	pub fn disconnect(&self, cleanup_only: bool) {
		if cleanup_only {
			let discarded = {
				let mut pending = self.pending.lock().unwrap();
				let discarded = pending.len();
				pending.clear();
				discarded
			};
			if discarded > 0 {
				warn!(
					discarded,
					"Discarded pending publishes during cleanup-only disconnect"
				);
			}
		} else if let Err(err) = self.dispatch_pending() {
			warn!(
				error = %err,
				"Failed to dispatch pending publishes during disconnect"
			);
		}

		self.store.remove_all();
		info!(
			connection = ?self.id,
			references = self.references.current(),
			"Connection subscription state torn down"
		);
	}
}
