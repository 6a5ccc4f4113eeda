//! The subscription store: an insertion-ordered collection of records
//! owned by one connection.

#![allow(clippy::missing_docs_in_private_items)]

use std::sync::{Arc, Mutex};

use arcstr::ArcStr;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::alloc::{SubscriptionAlloc, SystemAlloc};
use super::error::StoreResult;
use super::subscription::{
	PacketIdentity, Subscription, SubscriptionCallback, SubscriptionRequest,
};
use crate::topic::topic_matches;

/// Parameters for matching records by topic text.
#[derive(Debug, Clone, Copy)]
pub struct TopicMatchParams<'a> {
	/// Topic name to match record filters against.
	pub topic_name: &'a str,
	/// Require literal byte equality instead of wildcard semantics.
	pub exact_match_only: bool,
}

/// Parameters for matching records by packet identity.
#[derive(Debug, Clone, Copy)]
pub struct PacketMatchParams {
	/// Packet identifier of the Subscribe request.
	pub packet_identifier: u16,
	/// Position within the request batch; `None` matches any order.
	pub order: Option<usize>,
}

/// Predicate selector for [`SubscriptionStore::find_first_match`].
#[derive(Debug, Clone, Copy)]
pub enum MatchQuery<'a> {
	/// Match record filters against a topic name.
	Topic(TopicMatchParams<'a>),
	/// Match records against a packet identity.
	Packet(PacketMatchParams),
}

/// A matched record with the callback and filter snapshotted under the
/// registry lock.
pub(crate) type MatchedSubscription =
	(Arc<Subscription>, Arc<dyn SubscriptionCallback>, ArcStr);

/// Collection of subscription records, deduplicated by literal filter
/// text and scanned in insertion order.
///
/// The registry lock guards only the collection structure; reference
/// counts live behind each record's own lock. Batched add and remove
/// calls hold the registry lock once, so no partial batch state is
/// ever observable.
pub struct SubscriptionStore {
	records: Mutex<Vec<Arc<Subscription>>>,
	alloc: Arc<dyn SubscriptionAlloc>,
}

impl SubscriptionStore {
	/// Creates an empty store using the process allocator.
	pub fn new() -> Self {
		Self::with_alloc(Arc::new(SystemAlloc))
	}

	/// Creates an empty store with a custom allocation policy.
	pub fn with_alloc(alloc: Arc<dyn SubscriptionAlloc>) -> Self {
		Self {
			records: Mutex::new(Vec::new()),
			alloc,
		}
	}

	/// Registers a batch of subscriptions under one packet identifier;
	/// each element's position in the batch becomes its order.
	///
	/// An element whose filter text already has a record updates that
	/// record's packet identity and callback in place, leaving its
	/// reference count untouched. Otherwise a new record is allocated
	/// and appended. If allocation fails partway through, every record
	/// created by this call is removed again and the store is exactly
	/// as it was before the call; in-place updates are kept.
	pub fn add_subscriptions(
		&self,
		packet_identifier: u16,
		requests: &[SubscriptionRequest],
	) -> StoreResult<()> {
		let mut records = self.records.lock().unwrap();
		let rollback_len = records.len();

		for (order, request) in requests.iter().enumerate() {
			let packet = PacketIdentity {
				identifier: packet_identifier,
				order,
			};

			if let Some(existing) = records.iter().find(|record| {
				topic_matches(&request.topic_filter, record.topic_filter(), true)
			}) {
				existing.update_meta(packet, Arc::clone(&request.callback));
				debug!(
					topic_filter = %request.topic_filter,
					packet_identifier,
					order,
					"Updated existing subscription in place"
				);
				continue;
			}

			if let Err(err) = self.alloc.allocate_record() {
				// New records only ever land at the tail, so restoring
				// the pre-call length undoes exactly this batch.
				records.truncate(rollback_len);
				warn!(
					topic_filter = %request.topic_filter,
					packet_identifier,
					order,
					"Subscription allocation failed, batch rolled back"
				);
				return Err(err.into());
			}

			records.push(Arc::new(Subscription::new(
				request.topic_filter.clone(),
				packet,
				Arc::clone(&request.callback),
			)));
		}

		Ok(())
	}

	/// Removes every record created or last updated by the given
	/// packet identifier; `order` narrows the removal to one batch
	/// element, `None` removes the whole batch. No-op when nothing
	/// matches.
	pub fn remove_by_packet(
		&self,
		packet_identifier: u16,
		order: Option<usize>,
	) {
		self.remove_where(|record| {
			let packet = record.packet_identity();
			packet.identifier == packet_identifier
				&& order.is_none_or(|order| packet.order == order)
		});
	}

	/// Removes every record whose filter text exactly equals one of the
	/// supplied filters. No-op when nothing matches.
	pub fn remove_by_topic_filter(&self, filters: &[ArcStr]) {
		if filters.is_empty() {
			return;
		}
		self.remove_where(|record| {
			filters
				.iter()
				.any(|filter| topic_matches(filter, record.topic_filter(), true))
		});
	}

	/// Removes every record; used by connection teardown.
	pub fn remove_all(&self) {
		self.remove_where(|_| true);
	}

	/// Unlinks all records satisfying the predicate, then releases each
	/// one outside the registry lock.
	fn remove_where(&self, predicate: impl Fn(&Arc<Subscription>) -> bool) {
		let removed: Vec<Arc<Subscription>> = {
			let mut records = self.records.lock().unwrap();
			let mut removed = Vec::new();
			records.retain(|record| {
				if predicate(record) {
					removed.push(Arc::clone(record));
					false
				} else {
					true
				}
			});
			removed
		};

		for record in removed {
			if record.detach() {
				debug!(topic_filter = %record.topic_filter(), "Subscription removed");
			} else {
				debug!(
					topic_filter = %record.topic_filter(),
					references = record.reference_count(),
					"Subscription detached, free deferred until callbacks drain"
				);
			}
		}
	}

	/// Returns the first record satisfying the query, scanning in
	/// insertion order.
	pub fn find_first_match(
		&self,
		query: &MatchQuery<'_>,
	) -> Option<Arc<Subscription>> {
		let records = self.records.lock().unwrap();
		records
			.iter()
			.find(|record| Self::record_matches(record, query))
			.map(Arc::clone)
	}

	fn record_matches(record: &Arc<Subscription>, query: &MatchQuery<'_>) -> bool {
		match query {
			| MatchQuery::Topic(params) => topic_matches(
				params.topic_name,
				record.topic_filter(),
				params.exact_match_only,
			),
			| MatchQuery::Packet(params) => {
				let packet = record.packet_identity();
				packet.identifier == params.packet_identifier
					&& params.order.is_none_or(|order| packet.order == order)
			}
		}
	}

	/// Collects every record covering the topic name (wildcard mode),
	/// snapshotting each callback under the registry lock.
	pub(crate) fn collect_matches(
		&self,
		topic_name: &str,
	) -> SmallVec<[MatchedSubscription; 4]> {
		let records = self.records.lock().unwrap();
		records
			.iter()
			.filter(|record| {
				topic_matches(topic_name, record.topic_filter(), false)
			})
			.map(|record| {
				(
					Arc::clone(record),
					record.snapshot_callback(),
					record.topic_filter().clone(),
				)
			})
			.collect()
	}

	/// Number of live records.
	pub fn len(&self) -> usize {
		self.records.lock().unwrap().len()
	}

	/// Whether the store has no live records.
	pub fn is_empty(&self) -> bool {
		self.records.lock().unwrap().is_empty()
	}
}

impl Default for SubscriptionStore {
	fn default() -> Self {
		Self::new()
	}
}
