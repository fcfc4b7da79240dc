use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::{CollectionIndex, Location};
use crate::diff::ChangeBatch;
use crate::diff::recorder::BatchRecorder;
use crate::error::{IndexError, ItemFailure, Result};
use crate::group::Entry;
use crate::grouping::{GroupKey, Record};
use crate::sort::{OrderKey, SortKey};

/// An item whose keys were extracted successfully.
struct Prepared<T: Record> {
	id: T::Id,
	item: Arc<T>,
	group: GroupKey,
	sort: SortKey,
}

impl<T: Record> CollectionIndex<T> {
	/// Inserts items, upserting any whose id is already present.
	///
	/// An upserted item keeps its insertion sequence and is repositioned by
	/// its current keys, possibly into another group. Items rejected by an
	/// extractor are skipped and reported together once the rest of the call
	/// has been applied.
	pub fn insert_items<I>(&mut self, items: I) -> Result<ChangeBatch>
	where
		I: IntoIterator,
		I::Item: Into<Arc<T>>,
	{
		self.upsert(items.into_iter().map(Into::into).collect(), false, "insert")
	}

	/// Replaces stored items and recomputes their positions.
	///
	/// Absent items are inserted. With `move_to_top`, every applied item is
	/// pinned to the head of its group (latest pin first) until a later
	/// upsert without `move_to_top` releases it back to comparator order.
	pub fn update_items<I>(&mut self, items: I, move_to_top: bool) -> Result<ChangeBatch>
	where
		I: IntoIterator,
		I::Item: Into<Arc<T>>,
	{
		self.upsert(items.into_iter().map(Into::into).collect(), move_to_top, "update")
	}

	fn upsert(&mut self, items: Vec<Arc<T>>, move_to_top: bool, op: &'static str) -> Result<ChangeBatch> {
		let mut failures = Vec::new();
		let mut prepared = Vec::with_capacity(items.len());
		for item in last_occurrence_wins(items) {
			let id = item.id();
			match self.extract(&item) {
				Ok((group, sort)) => prepared.push(Prepared { id, item, group, sort }),
				Err(error) => failures.push(ItemFailure { id: format!("{id:?}"), error }),
			}
		}

		let mut recorder = BatchRecorder::new();
		for entry in &prepared {
			if let Some(path) = self.path_of_id(&entry.id) {
				let serial = self.groups[path.group].serial;
				recorder.capture_entry(entry.id.clone(), path, serial);
			}
		}

		for entry in prepared {
			self.apply_upsert(entry, move_to_top, &mut recorder);
		}

		let batch = self.finish(recorder, op);
		if failures.is_empty() {
			return Ok(batch);
		}

		tracing::warn!(op, skipped = failures.len(), first = %failures[0].error, "index.batch.extractor_failure");
		Err(IndexError::ExtractorFailure { failures, applied: batch })
	}

	fn apply_upsert(&mut self, prepared: Prepared<T>, move_to_top: bool, recorder: &mut BatchRecorder<T::Id>) {
		let Prepared { id, item, group, sort } = prepared;
		let pin = if move_to_top {
			self.next_pin = self.next_pin.wrapping_add(1);
			self.next_pin
		} else {
			0
		};

		let Some(previous) = self.locations.get(&id).cloned() else {
			self.next_seq = self.next_seq.wrapping_add(1);
			let order = OrderKey { pin, sort, seq: self.next_seq };
			self.attach(id.clone(), group, Entry { item, order }, recorder);
			recorder.inserted(id);
			return;
		};

		let order = OrderKey {
			pin,
			sort,
			seq: previous.order.seq,
		};
		if previous.group == group && previous.order == order {
			let chain = &self.chain;
			if let Some(target) = self.groups.get_mut(&group)
				&& let Ok(slot) = target.entries.binary_search_by(|entry| chain.compare_order(&entry.order, &order))
			{
				target.entries[slot].item = item;
				recorder.updated(id);
			}
			return;
		}

		self.detach(&id, &previous);
		self.attach(id.clone(), group, Entry { item, order }, recorder);
		self.prune_if_empty(&previous.group);
		recorder.moved(id);
	}

	/// Inserts `entry` at its comparator position, creating an implicit group if needed.
	fn attach(&mut self, id: T::Id, key: GroupKey, entry: Entry<T>, recorder: &mut BatchRecorder<T::Id>) {
		self.ensure_group(&key, recorder);
		let chain = &self.chain;
		let Some(group) = self.groups.get_mut(&key) else {
			return;
		};
		let slot = group.entries.partition_point(|existing| chain.compare_order(&existing.order, &entry.order).is_lt());
		self.locations.insert(
			id,
			Location {
				group: key,
				order: entry.order.clone(),
			},
		);
		group.entries.insert(slot, entry);
	}

	/// Takes an entry out of its group without pruning the group.
	fn detach(&mut self, id: &T::Id, location: &Location) {
		let chain = &self.chain;
		if let Some(group) = self.groups.get_mut(&location.group)
			&& let Ok(slot) = group.entries.binary_search_by(|entry| chain.compare_order(&entry.order, &location.order))
		{
			group.entries.remove(slot);
		}
		self.locations.remove(id);
	}
}

/// Collapses duplicate ids, keeping the first position and the last value.
fn last_occurrence_wins<T: Record>(items: Vec<Arc<T>>) -> Vec<Arc<T>> {
	let mut slots: FxHashMap<T::Id, usize> = FxHashMap::default();
	let mut unique: Vec<Arc<T>> = Vec::with_capacity(items.len());
	for item in items {
		match slots.get(&item.id()) {
			Some(&slot) => unique[slot] = item,
			None => {
				slots.insert(item.id(), unique.len());
				unique.push(item);
			}
		}
	}
	unique
}
