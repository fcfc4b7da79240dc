use std::fmt;

use crate::diff::{ChangeBatch, ChangeEvent};

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&ChangeEvent)>;

/// Synchronous fan-out of change events.
///
/// Subscribers run on the mutating caller's context, in subscription order,
/// before the mutating call returns.
#[derive(Default)]
pub struct EventBus {
	next_id: u64,
	subscribers: Vec<(SubscriptionId, Subscriber)>,
}

impl EventBus {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn subscribe(&mut self, subscriber: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
		self.next_id = self.next_id.wrapping_add(1);
		let id = SubscriptionId(self.next_id);
		self.subscribers.push((id, Box::new(subscriber)));
		tracing::trace!(subscription = id.0, subscribers = self.subscribers.len(), "bus.subscribe");
		id
	}

	/// Returns `false` if the id was not subscribed.
	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		let before = self.subscribers.len();
		self.subscribers.retain(|(sub, _)| *sub != id);
		before != self.subscribers.len()
	}

	pub fn len(&self) -> usize {
		self.subscribers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.subscribers.is_empty()
	}

	/// Delivers every event of `batch` to every subscriber.
	///
	/// Each subscriber sees the whole bracketed batch before the next one
	/// starts. Empty batches publish nothing.
	pub fn publish(&mut self, batch: &ChangeBatch) {
		if batch.is_empty() || self.subscribers.is_empty() {
			return;
		}
		let events = batch.events();
		for (_, subscriber) in &mut self.subscribers {
			for event in &events {
				subscriber(event);
			}
		}
	}
}

impl fmt::Debug for EventBus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EventBus").field("subscribers", &self.subscribers.len()).finish()
	}
}
