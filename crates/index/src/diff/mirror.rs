use thiserror::Error;

use super::{ChangeBatch, ChangeEvent};
use crate::grouping::{GroupKey, Record};
use crate::index::CollectionIndex;
use crate::path::IndexPath;

/// Replay failure: an event addressed a slot the mirror does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
	#[error("group index {0} out of range")]
	Group(usize),
	#[error("path {0} out of range")]
	Path(IndexPath),
}

/// Plain copy of an index's shape, maintained only from change events.
///
/// This is what a list surface does with a batch: replay each event in
/// order against its own structure, reading inserted values from the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mirror<Id> {
	groups: Vec<(GroupKey, Vec<Id>)>,
}

impl<Id: Clone> Mirror<Id> {
	/// Snapshots the current shape of `index`.
	pub fn capture<T: Record<Id = Id>>(index: &CollectionIndex<T>) -> Self {
		let groups = index.groups().map(|group| (group.key().clone(), group.iter().map(|item| item.id()).collect())).collect();
		Self { groups }
	}

	pub fn groups(&self) -> &[(GroupKey, Vec<Id>)] {
		&self.groups
	}

	/// Replays `batch` event by event. `index` must be in the post-batch state.
	pub fn apply<T: Record<Id = Id>>(&mut self, batch: &ChangeBatch, index: &CollectionIndex<T>) -> Result<(), MirrorError> {
		for event in batch.events() {
			match event {
				ChangeEvent::BeginUpdate | ChangeEvent::EndUpdate => {}
				ChangeEvent::ObjectsDeleted(paths) => {
					for path in paths {
						let members = self.members_mut(path)?;
						if path.item >= members.len() {
							return Err(MirrorError::Path(path));
						}
						members.remove(path.item);
					}
				}
				ChangeEvent::GroupsDeleted(indices) => {
					for group in indices {
						if group >= self.groups.len() {
							return Err(MirrorError::Group(group));
						}
						self.groups.remove(group);
					}
				}
				ChangeEvent::GroupsInserted(indices) => {
					for group in indices {
						let key = index.group_key(group).ok_or(MirrorError::Group(group))?.clone();
						if group > self.groups.len() {
							return Err(MirrorError::Group(group));
						}
						self.groups.insert(group, (key, Vec::new()));
					}
				}
				ChangeEvent::ObjectsInserted(paths) => {
					for path in paths {
						let id = index.item_at(path).map_err(|_| MirrorError::Path(path))?.id();
						let members = self.members_mut(path)?;
						if path.item > members.len() {
							return Err(MirrorError::Path(path));
						}
						members.insert(path.item, id);
					}
				}
				ChangeEvent::ObjectsUpdated(paths) => {
					for path in paths {
						let id = index.item_at(path).map_err(|_| MirrorError::Path(path))?.id();
						let slot = self.members_mut(path)?.get_mut(path.item).ok_or(MirrorError::Path(path))?;
						*slot = id;
					}
				}
			}
		}
		Ok(())
	}

	fn members_mut(&mut self, path: IndexPath) -> Result<&mut Vec<Id>, MirrorError> {
		self.groups.get_mut(path.group).map(|(_, members)| members).ok_or(MirrorError::Group(path.group))
	}
}
