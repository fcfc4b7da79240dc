use std::cmp::Ordering;

use proptest::prelude::*;
use rustc_hash::FxHashSet;

use super::CollectionIndex;
use super::tests::{Row, index, index_with, row};
use crate::diff::{ChangeBatch, Mirror};
use crate::error::Result;
use crate::grouping::GroupKey;
use crate::options::IndexOptions;
use crate::path::IndexPath;

const KEYS: [&str; 4] = ["a", "b", "c", "d"];

#[derive(Debug, Clone)]
enum Op {
	Insert(Vec<Row>),
	Update(Vec<Row>, bool),
	RemoveAt(Vec<(usize, usize)>),
	RemoveGroup(&'static str),
	CreateGroup(&'static str),
	RemoveAll,
}

fn arb_key() -> impl Strategy<Value = &'static str> {
	prop::sample::select(KEYS.to_vec())
}

fn arb_row() -> impl Strategy<Value = Row> {
	(0u32..24, arb_key(), -5i64..5).prop_map(|(id, key, sort)| row(id, key, sort))
}

fn arb_op() -> impl Strategy<Value = Op> {
	prop_oneof![
		4 => prop::collection::vec(arb_row(), 0..6).prop_map(Op::Insert),
		3 => (prop::collection::vec(arb_row(), 0..4), any::<bool>()).prop_map(|(rows, top)| Op::Update(rows, top)),
		3 => prop::collection::vec((0usize..8, 0usize..8), 0..4).prop_map(Op::RemoveAt),
		1 => arb_key().prop_map(Op::RemoveGroup),
		1 => arb_key().prop_map(Op::CreateGroup),
		1 => Just(Op::RemoveAll),
	]
}

/// Maps raw coordinates onto paths valid for the current state.
fn valid_paths(index: &CollectionIndex<Row>, raw: &[(usize, usize)]) -> Vec<IndexPath> {
	raw.iter()
		.filter_map(|&(group, item)| {
			let groups = index.group_count();
			if groups == 0 {
				return None;
			}
			let group = group % groups;
			let len = index.item_count(group);
			(len > 0).then(|| IndexPath::new(group, item % len))
		})
		.collect()
}

fn apply(index: &mut CollectionIndex<Row>, op: &Op) -> Result<ChangeBatch> {
	match op {
		Op::Insert(rows) => index.insert_items(rows.clone()),
		Op::Update(rows, top) => index.update_items(rows.clone(), *top),
		Op::RemoveAt(raw) => {
			let paths = valid_paths(index, raw);
			index.remove_items_at(paths)
		}
		Op::RemoveGroup(key) => Ok(index.remove_group(&GroupKey::from(*key))),
		Op::CreateGroup(key) => index.create_group(*key, key.to_uppercase()),
		Op::RemoveAll => Ok(index.remove_all()),
	}
}

/// Asserts every structural invariant of the index.
fn check_invariants(index: &CollectionIndex<Row>) {
	let mut keys = FxHashSet::default();
	let mut seen = FxHashSet::default();
	for (group_index, group) in index.groups.values().enumerate() {
		assert!(keys.insert(group.key.clone()), "duplicate group key {}", group.key);
		assert!(group.is_explicit() || !group.is_empty(), "empty implicit group {}", group.key);

		for pair in group.entries.windows(2) {
			assert_eq!(index.chain.compare_order(&pair[0].order, &pair[1].order), Ordering::Less, "group {} out of order", group.key);
			if pair[0].order.pin == 0 && pair[1].order.pin == 0 {
				assert!(pair[0].item.sort <= pair[1].item.sort, "unpinned members out of sort order");
			}
		}

		for (item_index, entry) in group.entries.iter().enumerate() {
			assert_eq!(entry.item.key, group.key.as_str(), "member filed under the wrong group");
			assert!(seen.insert(entry.item.id), "id {} appears twice", entry.item.id);
			assert_eq!(index.path_of_id(&entry.item.id), Some(IndexPath::new(group_index, item_index)));
		}
	}
	assert_eq!(seen.len(), index.len());
}

/// Must keep groups unique, members strictly ordered and ids unique after every call.
///
/// * Enforced in: `CollectionIndex::attach`, `CollectionIndex::prune_if_empty`
/// * Failure symptom: list sections render out of order or show one record twice.
#[test]
fn test_invariants_hold_after_every_call() {
	proptest!(|(ops in prop::collection::vec(arb_op(), 1..40))| {
		let mut index = index();
		for op in &ops {
			let _ = apply(&mut index, op);
			check_invariants(&index);
		}
	});
}

/// Must produce batches that replay cleanly onto a mirror of the pre-call state.
///
/// * Enforced in: `BatchRecorder::finish`
/// * Failure symptom: the list surface raises an inconsistency error or shows rows in the wrong slots.
#[test]
fn test_batches_replay_onto_mirror() {
	proptest!(|(ops in prop::collection::vec(arb_op(), 1..40), prune in any::<bool>())| {
		let mut index = index_with(IndexOptions {
			prune_empty_explicit_groups: prune,
		});
		for op in &ops {
			let mut mirror = Mirror::capture(&index);
			let batch = match apply(&mut index, op) {
				Ok(batch) => batch,
				Err(err) => err.applied().cloned().unwrap_or_default(),
			};
			prop_assert_eq!(mirror.apply(&batch, &index), Ok(()));
			prop_assert_eq!(&mirror, &Mirror::capture(&index));
		}
	});
}

/// Must treat a repeated insert of the same ids as a no-op on counts.
///
/// * Enforced in: `CollectionIndex::upsert`
/// * Failure symptom: refreshing a page duplicates rows.
#[test]
fn test_repeated_insert_is_idempotent() {
	proptest!(|(rows in prop::collection::vec(arb_row(), 0..16))| {
		let mut once = index();
		once.insert_items(rows.clone()).unwrap();

		let mut twice = index();
		twice.insert_items(rows.clone()).unwrap();
		let second = twice.insert_items(rows.clone()).unwrap();

		prop_assert_eq!(once.len(), twice.len());
		prop_assert_eq!(once.group_count(), twice.group_count());
		prop_assert!(second.objects_inserted.is_empty());
		prop_assert_eq!(Mirror::capture(&once), Mirror::capture(&twice));
	});
}

/// Must return to the empty state when removing exactly the inserted paths.
///
/// * Enforced in: `CollectionIndex::remove_items_at`
/// * Failure symptom: empty sections linger after clearing a freshly loaded page.
#[test]
fn test_insert_then_remove_round_trips() {
	proptest!(|(rows in prop::collection::vec(arb_row(), 0..16))| {
		let mut index = index();
		let batch = index.insert_items(rows).unwrap();
		index.remove_items_at(batch.objects_inserted).unwrap();

		prop_assert!(index.is_empty());
		prop_assert_eq!(index.group_count(), 0);
	});
}
