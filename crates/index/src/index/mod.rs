//! Collection index: ordered groups of comparator-ordered items.
//!
//! The index is not thread-safe. Mutate it from one serial context and
//! marshal background results onto that context before applying them.

mod remove;
mod upsert;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod tests;

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashMap};

use crate::bus::{EventBus, SubscriptionId};
use crate::diff::recorder::BatchRecorder;
use crate::diff::{ChangeBatch, ChangeEvent};
use crate::error::{ExtractError, IndexError, Result};
use crate::group::{Group, GroupOrigin};
use crate::grouping::{GroupKey, Grouping, Record};
use crate::options::IndexOptions;
use crate::path::IndexPath;
use crate::sort::{ComparatorChain, OrderKey, SortKey};

/// Reverse-index record: which group holds an entry and its order key there.
#[derive(Debug, Clone)]
struct Location {
	group: GroupKey,
	order: OrderKey,
}

/// Grouped, sorted collection of shared items.
///
/// After every public call:
/// * group keys are unique;
/// * each group is strictly ordered by (pin, sort key, insertion sequence);
/// * no id appears twice;
/// * no implicit group is empty.
pub struct CollectionIndex<T: Record> {
	grouping: Grouping<T>,
	chain: ComparatorChain<T>,
	options: IndexOptions,
	groups: IndexMap<GroupKey, Group<T>, FxBuildHasher>,
	locations: FxHashMap<T::Id, Location>,
	next_seq: u64,
	next_pin: u64,
	next_serial: u64,
	bus: EventBus,
}

impl<T: Record> CollectionIndex<T> {
	pub fn new(grouping: Grouping<T>, chain: ComparatorChain<T>, options: IndexOptions) -> Self {
		Self {
			grouping,
			chain,
			options,
			groups: IndexMap::with_hasher(FxBuildHasher),
			locations: FxHashMap::default(),
			next_seq: 0,
			next_pin: 0,
			next_serial: 0,
			bus: EventBus::new(),
		}
	}

	pub fn options(&self) -> &IndexOptions {
		&self.options
	}

	pub fn comparator(&self) -> &ComparatorChain<T> {
		&self.chain
	}

	/// Registers a synchronous change-event subscriber.
	pub fn subscribe(&mut self, subscriber: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
		self.bus.subscribe(subscriber)
	}

	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		self.bus.unsubscribe(id)
	}

	pub fn group_count(&self) -> usize {
		self.groups.len()
	}

	/// Member count of a group; `0` for an unknown group index.
	pub fn item_count(&self, group: usize) -> usize {
		self.groups.get_index(group).map_or(0, |(_, group)| group.len())
	}

	/// Total number of items across groups.
	pub fn len(&self) -> usize {
		self.locations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.locations.is_empty()
	}

	/// Display title of a group.
	///
	/// Explicit groups use their creation title. Implicit groups derive it
	/// from their first member.
	pub fn title_of(&self, group: usize) -> Option<String> {
		let (_, group) = self.groups.get_index(group)?;
		match &group.origin {
			GroupOrigin::Explicit { title } => Some(title.clone()),
			GroupOrigin::Implicit => group.get(0).map(|item| self.grouping.title_of(item)),
		}
	}

	pub fn group_key(&self, group: usize) -> Option<&GroupKey> {
		self.groups.get_index(group).map(|(key, _)| key)
	}

	pub fn group(&self, group: usize) -> Option<&Group<T>> {
		self.groups.get_index(group).map(|(_, group)| group)
	}

	/// Members of a group in display order; empty for an unknown group.
	pub fn items(&self, group: usize) -> impl Iterator<Item = &Arc<T>> + '_ {
		self.group(group).into_iter().flat_map(Group::iter)
	}

	pub fn group_index_of(&self, key: &GroupKey) -> Option<usize> {
		self.groups.get_index_of(key)
	}

	/// Groups in display order.
	pub fn groups(&self) -> impl ExactSizeIterator<Item = &Group<T>> + '_ {
		self.groups.values()
	}

	pub fn item_at(&self, path: IndexPath) -> Result<&Arc<T>> {
		self.groups
			.get_index(path.group)
			.and_then(|(_, group)| group.get(path.item))
			.ok_or(IndexError::InvalidIndexPath { path })
	}

	/// Current path of `item`, located by its id through the reverse index.
	pub fn path_of(&self, item: &T) -> Option<IndexPath> {
		self.path_of_id(&item.id())
	}

	pub fn path_of_id(&self, id: &T::Id) -> Option<IndexPath> {
		let location = self.locations.get(id)?;
		let (group_index, _, group) = self.groups.get_full(&location.group)?;
		let item = group.entries.binary_search_by(|entry| self.chain.compare_order(&entry.order, &location.order)).ok()?;
		Some(IndexPath::new(group_index, item))
	}

	pub fn contains(&self, id: &T::Id) -> bool {
		self.locations.contains_key(id)
	}

	/// Every item with its path, in display order.
	pub fn iter(&self) -> impl Iterator<Item = (IndexPath, &Arc<T>)> + '_ {
		self.groups
			.values()
			.enumerate()
			.flat_map(|(group_index, group)| group.iter().enumerate().map(move |(item, value)| (IndexPath::new(group_index, item), value)))
	}

	fn check_path(&self, path: IndexPath) -> Result<()> {
		if path.item < self.item_count(path.group) {
			Ok(())
		} else {
			Err(IndexError::InvalidIndexPath { path })
		}
	}

	fn extract(&self, item: &T) -> std::result::Result<(GroupKey, SortKey), ExtractError> {
		Ok((self.grouping.key_of(item)?, self.chain.sort_key(item)?))
	}

	fn is_prunable(&self, group: &Group<T>) -> bool {
		!group.is_explicit() || self.options.prune_empty_explicit_groups
	}

	/// Destroys the group under `key` if it is empty and prunable.
	fn prune_if_empty(&mut self, key: &GroupKey) -> bool {
		let prunable = self.groups.get(key).is_some_and(|group| group.is_empty() && self.is_prunable(group));
		if prunable {
			self.groups.shift_remove(key);
			tracing::trace!(group = %key, "index.group.pruned");
		}
		prunable
	}

	/// Allocates a fresh implicit group at the end of the group order.
	fn ensure_group(&mut self, key: &GroupKey, recorder: &mut BatchRecorder<T::Id>) {
		if self.groups.contains_key(key) {
			return;
		}
		let serial = self.next_serial();
		self.groups.insert(key.clone(), Group::new(key.clone(), GroupOrigin::Implicit, serial));
		recorder.group_created(serial);
	}

	fn next_serial(&mut self) -> u64 {
		self.next_serial = self.next_serial.wrapping_add(1);
		self.next_serial
	}

	fn live_groups(&self) -> FxHashMap<u64, usize> {
		self.groups.values().enumerate().map(|(index, group)| (group.serial, index)).collect()
	}

	/// Resolves the recorded batch, publishes it and hands it back.
	fn finish(&mut self, recorder: BatchRecorder<T::Id>, op: &'static str) -> ChangeBatch {
		let live = self.live_groups();
		let batch = recorder.finish(&live, |id| self.path_of_id(id));
		tracing::trace!(
			op,
			objects_deleted = batch.objects_deleted.len(),
			groups_deleted = batch.groups_deleted.len(),
			groups_inserted = batch.groups_inserted.len(),
			objects_inserted = batch.objects_inserted.len(),
			objects_updated = batch.objects_updated.len(),
			groups = self.groups.len(),
			items = self.locations.len(),
			"index.batch.applied"
		);
		self.bus.publish(&batch);
		batch
	}
}

impl<T: Record> fmt::Debug for CollectionIndex<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CollectionIndex")
			.field("groups", &self.groups.len())
			.field("items", &self.locations.len())
			.field("chain", &self.chain)
			.field("options", &self.options)
			.finish_non_exhaustive()
	}
}
