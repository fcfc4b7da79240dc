//! Ordered change batches.
//!
//! A batch lists every change produced by one mutating call, in the only
//! order under which a consumer replaying it event-by-event against its own
//! copy never addresses a missing slot:
//!
//! 1. objects deleted (pre-mutation paths, descending)
//! 2. groups deleted (pre-mutation indices, descending)
//! 3. groups inserted (post-mutation indices, ascending)
//! 4. objects inserted (post-mutation paths, ascending)
//! 5. objects updated in place (post-mutation paths, ascending)
//!
//! The phases are atomic; applying a prefix of a batch is unsupported.

mod mirror;
pub(crate) mod recorder;

pub use mirror::{Mirror, MirrorError};

use crate::path::IndexPath;

/// One event of a bracketed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
	BeginUpdate,
	ObjectsDeleted(Vec<IndexPath>),
	GroupsDeleted(Vec<usize>),
	GroupsInserted(Vec<usize>),
	ObjectsInserted(Vec<IndexPath>),
	/// Value replaced without a change of group or position.
	ObjectsUpdated(Vec<IndexPath>),
	EndUpdate,
}

/// All changes produced by one mutating call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
	pub objects_deleted: Vec<IndexPath>,
	pub groups_deleted: Vec<usize>,
	pub groups_inserted: Vec<usize>,
	pub objects_inserted: Vec<IndexPath>,
	pub objects_updated: Vec<IndexPath>,
}

impl ChangeBatch {
	pub fn is_empty(&self) -> bool {
		self.objects_deleted.is_empty()
			&& self.groups_deleted.is_empty()
			&& self.groups_inserted.is_empty()
			&& self.objects_inserted.is_empty()
			&& self.objects_updated.is_empty()
	}

	/// Total number of index paths and group indices carried.
	pub fn len(&self) -> usize {
		self.objects_deleted.len() + self.groups_deleted.len() + self.groups_inserted.len() + self.objects_inserted.len() + self.objects_updated.len()
	}

	/// Events in replay order, bracketed by begin/end markers.
	///
	/// Empty phases are omitted and an empty batch yields no events.
	pub fn events(&self) -> Vec<ChangeEvent> {
		if self.is_empty() {
			return Vec::new();
		}

		let mut events = Vec::with_capacity(7);
		events.push(ChangeEvent::BeginUpdate);
		if !self.objects_deleted.is_empty() {
			events.push(ChangeEvent::ObjectsDeleted(self.objects_deleted.clone()));
		}
		if !self.groups_deleted.is_empty() {
			events.push(ChangeEvent::GroupsDeleted(self.groups_deleted.clone()));
		}
		if !self.groups_inserted.is_empty() {
			events.push(ChangeEvent::GroupsInserted(self.groups_inserted.clone()));
		}
		if !self.objects_inserted.is_empty() {
			events.push(ChangeEvent::ObjectsInserted(self.objects_inserted.clone()));
		}
		if !self.objects_updated.is_empty() {
			events.push(ChangeEvent::ObjectsUpdated(self.objects_updated.clone()));
		}
		events.push(ChangeEvent::EndUpdate);
		events
	}
}
