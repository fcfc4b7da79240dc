use std::hash::Hash;

use rustc_hash::FxHashMap;

use super::ChangeBatch;
use crate::path::IndexPath;

/// Collects the touched entries and groups of one mutating call.
///
/// Pre-mutation locations must be captured before the first mutation of the
/// call; post-mutation locations are resolved once in [`Self::finish`].
#[derive(Debug)]
pub(crate) struct BatchRecorder<Id> {
	pre_paths: FxHashMap<Id, IndexPath>,
	/// Group serial -> pre-mutation group index.
	pre_groups: FxHashMap<u64, usize>,
	created_groups: Vec<u64>,
	deleted: Vec<Id>,
	inserted: Vec<Id>,
	updated: Vec<Id>,
}

impl<Id> Default for BatchRecorder<Id> {
	fn default() -> Self {
		Self {
			pre_paths: FxHashMap::default(),
			pre_groups: FxHashMap::default(),
			created_groups: Vec::new(),
			deleted: Vec::new(),
			inserted: Vec::new(),
			updated: Vec::new(),
		}
	}
}

impl<Id: Clone + Eq + Hash> BatchRecorder<Id> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn capture_entry(&mut self, id: Id, path: IndexPath, group_serial: u64) {
		self.pre_paths.insert(id, path);
		self.capture_group(group_serial, path.group);
	}

	pub fn capture_group(&mut self, serial: u64, index: usize) {
		self.pre_groups.entry(serial).or_insert(index);
	}

	pub fn removed(&mut self, id: Id) {
		self.deleted.push(id);
	}

	/// Entry left its slot; reported as delete at the pre path plus insert at the post path.
	pub fn moved(&mut self, id: Id) {
		self.deleted.push(id.clone());
		self.inserted.push(id);
	}

	pub fn inserted(&mut self, id: Id) {
		self.inserted.push(id);
	}

	pub fn updated(&mut self, id: Id) {
		self.updated.push(id);
	}

	pub fn group_created(&mut self, serial: u64) {
		self.created_groups.push(serial);
	}

	/// Resolves the batch against the post-mutation state.
	///
	/// `live_groups` maps the serial of every surviving group to its index;
	/// `post_path` locates a surviving entry.
	pub fn finish(self, live_groups: &FxHashMap<u64, usize>, post_path: impl Fn(&Id) -> Option<IndexPath>) -> ChangeBatch {
		let mut objects_deleted: Vec<_> = self.deleted.iter().filter_map(|id| self.pre_paths.get(id).copied()).collect();
		objects_deleted.sort_unstable_by(|a, b| b.cmp(a));
		objects_deleted.dedup();

		let mut groups_deleted: Vec<_> = self
			.pre_groups
			.iter()
			.filter(|(serial, _)| !live_groups.contains_key(serial))
			.map(|(_, index)| *index)
			.collect();
		groups_deleted.sort_unstable_by(|a, b| b.cmp(a));

		let mut groups_inserted: Vec<_> = self.created_groups.iter().filter_map(|serial| live_groups.get(serial).copied()).collect();
		groups_inserted.sort_unstable();
		groups_inserted.dedup();

		let mut objects_inserted: Vec<_> = self.inserted.iter().filter_map(&post_path).collect();
		objects_inserted.sort_unstable();
		objects_inserted.dedup();

		let mut objects_updated: Vec<_> = self.updated.iter().filter_map(&post_path).collect();
		objects_updated.sort_unstable();
		objects_updated.dedup();

		ChangeBatch {
			objects_deleted,
			groups_deleted,
			groups_inserted,
			objects_inserted,
			objects_updated,
		}
	}
}
