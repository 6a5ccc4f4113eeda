//! The subscription record and its callback capability.

#![allow(clippy::missing_docs_in_private_items)]

use std::fmt;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use arcstr::ArcStr;
use bytes::Bytes;
use tracing::trace;

use crate::connection::ConnectionId;

/// Identity of the Subscribe request element that created or last
/// updated a subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketIdentity {
	/// Packet identifier of the Subscribe request.
	pub identifier: u16,
	/// 0-based position of the filter within that request's batch.
	pub order: usize,
}

/// Message description handed to a subscription callback.
///
/// Carries enough context for the callback to validate which filter
/// triggered it and on which connection.
#[derive(Debug, Clone)]
pub struct CallbackMessage {
	/// Connection that dispatched this message.
	pub connection: ConnectionId,
	/// Topic name the message was published to.
	pub topic_name: ArcStr,
	/// Topic filter that matched the topic name. Differs from the
	/// topic name when the filter contains wildcards.
	pub matched_filter: ArcStr,
	/// Application payload.
	pub payload: Bytes,
}

/// Callback capability invoked once per matching publish.
///
/// Implementations may block for an application-defined period; the
/// dispatcher never runs them while holding a registry or
/// reference-count lock.
pub trait SubscriptionCallback: Send + Sync {
	/// Handles one published message.
	fn invoke(&self, message: &CallbackMessage);
}

impl<F> SubscriptionCallback for F
where F: Fn(&CallbackMessage) + Send + Sync
{
	fn invoke(&self, message: &CallbackMessage) {
		self(message)
	}
}

/// One (topic filter, callback) element of a Subscribe request batch.
#[derive(Clone)]
pub struct SubscriptionRequest {
	/// Topic filter to register, possibly containing wildcards.
	pub topic_filter: ArcStr,
	/// Callback to invoke for publishes covered by the filter.
	pub callback: Arc<dyn SubscriptionCallback>,
}

impl SubscriptionRequest {
	/// Creates a request from a filter and any callback closure.
	pub fn new(
		topic_filter: impl Into<ArcStr>,
		callback: impl SubscriptionCallback + 'static,
	) -> Self {
		Self {
			topic_filter: topic_filter.into(),
			callback: Arc::new(callback),
		}
	}
}

impl fmt::Debug for SubscriptionRequest {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SubscriptionRequest")
			.field("topic_filter", &self.topic_filter)
			.finish_non_exhaustive()
	}
}

/// Mutable identity of a record: which request currently owns the
/// filter and which callback it installed. Replaced in place when a
/// duplicate filter is added.
pub(crate) struct SubscriptionMeta {
	pub(crate) packet: PacketIdentity,
	pub(crate) callback: Arc<dyn SubscriptionCallback>,
}

/// Reference-count state of a record.
///
/// A record is Live while reachable in the store and Detached once
/// removed; a detached record is freed when its last in-flight
/// invocation drains.
#[derive(Debug, Clone, Copy)]
struct Lifecycle {
	references: i32,
	detached: bool,
}

/// One registered topic filter on a connection.
///
/// The filter text is immutable for the record's lifetime and unique
/// among live records of the same store. The metadata lock and the
/// lifecycle lock are distinct so reference counting never contends
/// with callback replacement; neither is ever held across a blocking
/// operation.
pub struct Subscription {
	topic_filter: ArcStr,
	meta: Mutex<SubscriptionMeta>,
	lifecycle: Mutex<Lifecycle>,
	count_changed: Condvar,
}

impl Subscription {
	pub(crate) fn new(
		topic_filter: ArcStr,
		packet: PacketIdentity,
		callback: Arc<dyn SubscriptionCallback>,
	) -> Self {
		Self {
			topic_filter,
			meta: Mutex::new(SubscriptionMeta { packet, callback }),
			lifecycle: Mutex::new(Lifecycle {
				references: 0,
				detached: false,
			}),
			count_changed: Condvar::new(),
		}
	}

	/// The record's topic filter text.
	pub fn topic_filter(&self) -> &ArcStr {
		&self.topic_filter
	}

	/// Identity of the Subscribe request that currently owns the record.
	pub fn packet_identity(&self) -> PacketIdentity {
		self.meta.lock().unwrap().packet
	}

	/// Number of in-flight callback invocations using this record.
	pub fn reference_count(&self) -> i32 {
		self.lifecycle.lock().unwrap().references
	}

	/// Whether the record has been removed from the store and is only
	/// kept alive by in-flight invocations.
	pub fn is_detached(&self) -> bool {
		self.lifecycle.lock().unwrap().detached
	}

	/// Blocks until the reference count equals `target` or the timeout
	/// elapses; returns whether the target was observed.
	///
	/// The internal condition variable is signaled on every count
	/// change, so waiters never poll.
	pub fn wait_for_references(&self, target: i32, timeout: Duration) -> bool {
		let state = self.lifecycle.lock().unwrap();
		let (state, _timeout_result) = self
			.count_changed
			.wait_timeout_while(state, timeout, |state| {
				state.references != target
			})
			.unwrap();
		state.references == target
	}

	pub(crate) fn update_meta(
		&self,
		packet: PacketIdentity,
		callback: Arc<dyn SubscriptionCallback>,
	) {
		let mut meta = self.meta.lock().unwrap();
		meta.packet = packet;
		meta.callback = callback;
	}

	pub(crate) fn snapshot_callback(&self) -> Arc<dyn SubscriptionCallback> {
		Arc::clone(&self.meta.lock().unwrap().callback)
	}

	/// Pins the record for one in-flight invocation.
	pub(crate) fn pin(&self) {
		{
			let mut state = self.lifecycle.lock().unwrap();
			state.references += 1;
		}
		self.count_changed.notify_all();
	}

	/// Releases one in-flight invocation.
	pub(crate) fn unpin(&self) {
		let drained = {
			let mut state = self.lifecycle.lock().unwrap();
			state.references -= 1;
			debug_assert!(state.references >= 0);
			state.detached && state.references == 0
		};
		self.count_changed.notify_all();
		if drained {
			trace!(
				topic_filter = %self.topic_filter,
				"Detached subscription drained, record can be freed"
			);
		}
	}

	/// Marks the record as removed from the store; returns whether no
	/// invocation is in flight, i.e. the record may be freed at once.
	pub(crate) fn detach(&self) -> bool {
		let mut state = self.lifecycle.lock().unwrap();
		state.detached = true;
		state.references == 0
	}
}

impl fmt::Debug for Subscription {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.lifecycle.lock().unwrap();
		f.debug_struct("Subscription")
			.field("topic_filter", &self.topic_filter)
			.field("packet", &self.packet_identity())
			.field("references", &state.references)
			.field("detached", &state.detached)
			.finish()
	}
}
