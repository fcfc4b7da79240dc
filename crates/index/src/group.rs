use std::sync::Arc;

use crate::grouping::GroupKey;
use crate::sort::OrderKey;

/// How a group came to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupOrigin {
	/// Created by the first insert carrying its key; destroyed when emptied.
	Implicit,
	/// Created by [`crate::CollectionIndex::create_group`]; survives being
	/// emptied unless pruning is enabled.
	Explicit { title: String },
}

#[derive(Debug, Clone)]
pub(crate) struct Entry<T> {
	pub item: Arc<T>,
	pub order: OrderKey,
}

/// A named bucket of items kept in comparator order.
#[derive(Debug, Clone)]
pub struct Group<T> {
	pub(crate) key: GroupKey,
	pub(crate) origin: GroupOrigin,
	/// Creation serial; distinguishes a group from a later one with the same key.
	pub(crate) serial: u64,
	pub(crate) entries: Vec<Entry<T>>,
}

impl<T> Group<T> {
	pub(crate) fn new(key: GroupKey, origin: GroupOrigin, serial: u64) -> Self {
		Self {
			key,
			origin,
			serial,
			entries: Vec::new(),
		}
	}

	pub fn key(&self) -> &GroupKey {
		&self.key
	}

	pub fn origin(&self) -> &GroupOrigin {
		&self.origin
	}

	pub fn is_explicit(&self) -> bool {
		matches!(self.origin, GroupOrigin::Explicit { .. })
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&Arc<T>> {
		self.entries.get(index).map(|entry| &entry.item)
	}

	/// Members in display order.
	pub fn iter(&self) -> impl ExactSizeIterator<Item = &Arc<T>> + '_ {
		self.entries.iter().map(|entry| &entry.item)
	}
}
