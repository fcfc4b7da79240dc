use super::CollectionIndex;
use crate::diff::ChangeBatch;
use crate::diff::recorder::BatchRecorder;
use crate::error::{IndexError, Result};
use crate::group::{Group, GroupOrigin};
use crate::grouping::{GroupKey, Record};
use crate::path::IndexPath;

impl<T: Record> CollectionIndex<T> {
	pub fn remove_item_at(&mut self, path: IndexPath) -> Result<ChangeBatch> {
		self.remove_items_at([path])
	}

	/// Removes several items addressed against the current state.
	///
	/// Every path is validated first; one bad path fails the whole call
	/// without mutating anything. Removals then run in descending path order
	/// so no removal shifts a path that is still pending.
	pub fn remove_items_at(&mut self, paths: impl IntoIterator<Item = IndexPath>) -> Result<ChangeBatch> {
		let mut paths: Vec<IndexPath> = paths.into_iter().collect();
		for &path in &paths {
			self.check_path(path)?;
		}
		paths.sort_unstable_by(|a, b| b.cmp(a));
		paths.dedup();

		let mut recorder = BatchRecorder::new();
		let mut ids = Vec::with_capacity(paths.len());
		for &path in &paths {
			let group = &self.groups[path.group];
			let id = group.entries[path.item].item.id();
			recorder.capture_entry(id.clone(), path, group.serial);
			ids.push(id);
		}

		let mut touched_groups: Vec<usize> = Vec::new();
		for (path, id) in paths.iter().zip(ids) {
			if let Some((_, group)) = self.groups.get_index_mut(path.group) {
				group.entries.remove(path.item);
			}
			self.locations.remove(&id);
			recorder.removed(id);
			if touched_groups.last() != Some(&path.group) {
				touched_groups.push(path.group);
			}
		}

		// Descending, so pruning one group never shifts another pending index.
		for group_index in touched_groups {
			if let Some(key) = self.group_key(group_index).cloned() {
				self.prune_if_empty(&key);
			}
		}

		Ok(self.finish(recorder, "remove"))
	}

	/// Removes the item with `id`, if present.
	pub fn remove_item(&mut self, id: &T::Id) -> Result<ChangeBatch> {
		match self.path_of_id(id) {
			Some(path) => self.remove_items_at([path]),
			None => Ok(ChangeBatch::default()),
		}
	}

	/// Removes every item and every group, implicit or explicit.
	pub fn remove_all(&mut self) -> ChangeBatch {
		let mut recorder = BatchRecorder::new();
		for (group_index, group) in self.groups.values().enumerate() {
			capture_members(&mut recorder, group, group_index);
		}
		self.groups.clear();
		self.locations.clear();
		self.finish(recorder, "remove_all")
	}

	/// Creates an empty explicit group at the end of the group order.
	pub fn create_group(&mut self, key: impl Into<GroupKey>, title: impl Into<String>) -> Result<ChangeBatch> {
		let key = key.into();
		if self.groups.contains_key(&key) {
			return Err(IndexError::DuplicateGroup(key));
		}

		let mut recorder = BatchRecorder::new();
		let serial = self.next_serial();
		let origin = GroupOrigin::Explicit { title: title.into() };
		self.groups.insert(key.clone(), Group::new(key, origin, serial));
		recorder.group_created(serial);
		Ok(self.finish(recorder, "create_group"))
	}

	/// Removes a group and all its members. Unknown keys are a no-op.
	pub fn remove_group(&mut self, key: &GroupKey) -> ChangeBatch {
		let Some(group_index) = self.groups.get_index_of(key) else {
			return ChangeBatch::default();
		};

		let mut recorder = BatchRecorder::new();
		if let Some(group) = self.groups.shift_remove(key) {
			capture_members(&mut recorder, &group, group_index);
			for entry in &group.entries {
				self.locations.remove(&entry.item.id());
			}
		}
		self.finish(recorder, "remove_group")
	}
}

fn capture_members<T: Record>(recorder: &mut BatchRecorder<T::Id>, group: &Group<T>, group_index: usize) {
	recorder.capture_group(group.serial, group_index);
	for (item_index, entry) in group.entries.iter().enumerate() {
		let id = entry.item.id();
		recorder.capture_entry(id.clone(), IndexPath::new(group_index, item_index), group.serial);
		recorder.removed(id);
	}
}
