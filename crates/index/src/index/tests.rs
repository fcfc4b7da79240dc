use std::cell::RefCell;
use std::rc::Rc;

use super::CollectionIndex;
use crate::diff::{ChangeBatch, ChangeEvent, Mirror};
use crate::error::{ExtractError, IndexError};
use crate::grouping::{GroupKey, Grouping, Record};
use crate::options::IndexOptions;
use crate::path::IndexPath;
use crate::sort::{ComparatorChain, Direction, SortValue};

#[derive(Debug, Clone, PartialEq)]
pub(super) struct Row {
	pub id: u32,
	pub key: &'static str,
	pub sort: i64,
}

impl Record for Row {
	type Id = u32;

	fn id(&self) -> u32 {
		self.id
	}
}

pub(super) fn row(id: u32, key: &'static str, sort: i64) -> Row {
	Row { id, key, sort }
}

pub(super) fn index_with(options: IndexOptions) -> CollectionIndex<Row> {
	CollectionIndex::new(
		Grouping::new(
			|row: &Row| {
				if row.key.is_empty() {
					Err(ExtractError::new("group", "empty key"))
				} else {
					Ok(GroupKey::from(row.key))
				}
			},
			|row: &Row| row.key.to_uppercase(),
		),
		ComparatorChain::new().ascending("sort", |row: &Row| row.sort),
		options,
	)
}

pub(super) fn index() -> CollectionIndex<Row> {
	index_with(IndexOptions::default())
}

fn ids(index: &CollectionIndex<Row>, group: usize) -> Vec<u32> {
	index.items(group).map(|row| row.id).collect()
}

fn p(group: usize, item: usize) -> IndexPath {
	IndexPath::new(group, item)
}

#[test]
fn items_of_unknown_group_is_empty() {
	let mut index = index();
	index.insert_items(vec![row(1, "a", 1)]).unwrap();
	assert_eq!(ids(&index, 0), vec![1]);
	assert_eq!(index.items(1).count(), 0);
}

#[test]
fn insert_into_empty_index_creates_implicit_group_in_sort_order() {
	let mut index = index();
	let batch = index.insert_items([row(1, "a", 2), row(2, "a", 1)]).unwrap();

	assert_eq!(index.group_count(), 1);
	assert_eq!(ids(&index, 0), vec![2, 1]);
	assert_eq!(batch.groups_inserted, vec![0]);
	assert_eq!(batch.objects_inserted, vec![p(0, 0), p(0, 1)]);
	assert!(batch.objects_deleted.is_empty());
}

#[test]
fn removing_last_member_destroys_implicit_group() {
	let mut index = index();
	index.insert_items([row(1, "a", 1)]).unwrap();

	let batch = index.remove_item_at(p(0, 0)).unwrap();

	assert_eq!(index.group_count(), 0);
	assert_eq!(batch.objects_deleted, vec![p(0, 0)]);
	assert_eq!(batch.groups_deleted, vec![0]);
}

#[test]
fn removing_one_of_two_members_keeps_group() {
	let mut index = index();
	index.insert_items([row(1, "a", 2), row(2, "a", 1)]).unwrap();

	let batch = index.remove_item_at(p(0, 1)).unwrap();

	assert_eq!(ids(&index, 0), vec![2]);
	assert_eq!(batch.objects_deleted, vec![p(0, 1)]);
	assert!(batch.groups_deleted.is_empty());
}

#[test]
fn update_with_move_to_top_migrates_between_groups() {
	let mut index = index();
	index.insert_items([row(1, "a", 1), row(2, "b", 1)]).unwrap();

	let batch = index.update_items([row(2, "a", 5)], true).unwrap();

	assert_eq!(index.group_count(), 1);
	assert_eq!(ids(&index, 0), vec![2, 1]);
	assert_eq!(
		batch.events(),
		vec![
			ChangeEvent::BeginUpdate,
			ChangeEvent::ObjectsDeleted(vec![p(1, 0)]),
			ChangeEvent::GroupsDeleted(vec![1]),
			ChangeEvent::ObjectsInserted(vec![p(0, 0)]),
			ChangeEvent::EndUpdate,
		]
	);
}

#[test]
fn pinned_items_stay_on_top_until_released() {
	let mut index = index();
	index.insert_items([row(1, "a", 1), row(2, "a", 2), row(3, "a", 3)]).unwrap();

	index.update_items([row(3, "a", 3)], true).unwrap();
	index.update_items([row(2, "a", 2)], true).unwrap();
	assert_eq!(ids(&index, 0), vec![2, 3, 1]);

	index.insert_items([row(4, "a", 0)]).unwrap();
	assert_eq!(ids(&index, 0), vec![2, 3, 4, 1]);

	index.update_items([row(2, "a", 2)], false).unwrap();
	assert_eq!(ids(&index, 0), vec![3, 4, 1, 2]);
}

#[test]
fn repeated_insert_is_idempotent() {
	let mut index = index();
	index.insert_items([row(1, "a", 1)]).unwrap();
	let batch = index.insert_items([row(1, "a", 1)]).unwrap();

	assert_eq!(index.len(), 1);
	assert_eq!(index.item_count(0), 1);
	assert!(batch.objects_inserted.is_empty());
	assert_eq!(batch.objects_updated, vec![p(0, 0)]);
}

#[test]
fn reinsert_with_new_sort_key_repositions() {
	let mut index = index();
	index.insert_items([row(1, "a", 1), row(2, "a", 2)]).unwrap();

	let batch = index.insert_items([row(1, "a", 3)]).unwrap();

	assert_eq!(ids(&index, 0), vec![2, 1]);
	assert_eq!(batch.objects_deleted, vec![p(0, 0)]);
	assert_eq!(batch.objects_inserted, vec![p(0, 1)]);
}

#[test]
fn sole_member_resorting_keeps_group_position() {
	let mut index = index();
	index.insert_items([row(1, "a", 1), row(2, "b", 1)]).unwrap();

	let batch = index.insert_items([row(1, "a", 9)]).unwrap();

	assert_eq!(index.group_key(0), Some(&GroupKey::from("a")));
	assert!(batch.groups_deleted.is_empty());
	assert!(batch.groups_inserted.is_empty());
}

#[test]
fn duplicate_ids_in_one_call_keep_last_value() {
	let mut index = index();
	index.insert_items([row(1, "a", 1), row(1, "b", 7)]).unwrap();

	assert_eq!(index.len(), 1);
	assert_eq!(index.group_key(0), Some(&GroupKey::from("b")));
}

#[test]
fn equal_sort_keys_keep_insertion_order() {
	let mut index = index();
	index.insert_items([row(3, "a", 1), row(1, "a", 1), row(2, "a", 1)]).unwrap();
	assert_eq!(ids(&index, 0), vec![3, 1, 2]);

	index.insert_items([row(3, "a", 1)]).unwrap();
	assert_eq!(ids(&index, 0), vec![3, 1, 2]);
}

#[test]
fn groups_keep_first_appearance_order() {
	let mut index = index();
	index.insert_items([row(1, "c", 1), row(2, "a", 1), row(3, "b", 1)]).unwrap();

	let keys: Vec<_> = (0..index.group_count()).filter_map(|group| index.group_key(group)).map(GroupKey::as_str).collect();
	assert_eq!(keys, vec!["c", "a", "b"]);
}

#[test]
fn multi_removal_uses_one_snapshot() {
	let mut index = index();
	index.insert_items([row(1, "a", 1), row(2, "a", 2), row(3, "a", 3), row(4, "b", 1)]).unwrap();

	let batch = index.remove_items_at([p(0, 0), p(0, 2), p(1, 0), p(0, 0)]).unwrap();

	assert_eq!(ids(&index, 0), vec![2]);
	assert_eq!(index.group_count(), 1);
	assert_eq!(batch.objects_deleted, vec![p(1, 0), p(0, 2), p(0, 0)]);
	assert_eq!(batch.groups_deleted, vec![1]);
}

#[test]
fn invalid_path_fails_without_mutation() {
	let mut index = index();
	index.insert_items([row(1, "a", 1), row(2, "a", 2)]).unwrap();

	let err = index.remove_items_at([p(0, 0), p(0, 2)]).unwrap_err();

	assert_eq!(err, IndexError::InvalidIndexPath { path: p(0, 2) });
	assert_eq!(index.len(), 2);
	assert_eq!(index.item_at(p(3, 0)).unwrap_err(), IndexError::InvalidIndexPath { path: p(3, 0) });
}

#[test]
fn explicit_group_survives_being_emptied() {
	let mut index = index();
	let batch = index.create_group("a", "Pinned").unwrap();
	assert_eq!(batch.groups_inserted, vec![0]);
	assert_eq!(index.title_of(0).as_deref(), Some("Pinned"));

	index.insert_items([row(1, "a", 1)]).unwrap();
	let batch = index.remove_item(&1).unwrap();

	assert_eq!(index.group_count(), 1);
	assert_eq!(index.item_count(0), 0);
	assert!(batch.groups_deleted.is_empty());
}

#[test]
fn explicit_group_pruned_when_configured() {
	let mut index = index_with(IndexOptions {
		prune_empty_explicit_groups: true,
	});
	index.create_group("a", "Pinned").unwrap();
	assert_eq!(index.group_count(), 1);

	index.insert_items([row(1, "a", 1)]).unwrap();
	let batch = index.remove_item(&1).unwrap();

	assert_eq!(index.group_count(), 0);
	assert_eq!(batch.groups_deleted, vec![0]);
}

#[test]
fn explicit_group_precedes_later_implicit_groups() {
	let mut index = index();
	index.insert_items([row(1, "z", 1)]).unwrap();
	index.create_group("a", "Alpha").unwrap();
	index.insert_items([row(2, "b", 1), row(3, "a", 1)]).unwrap();

	assert_eq!(index.group_index_of(&GroupKey::from("a")), Some(1));
	assert_eq!(index.group_index_of(&GroupKey::from("b")), Some(2));
	assert_eq!(index.title_of(1).as_deref(), Some("Alpha"));
	assert_eq!(index.title_of(2).as_deref(), Some("B"));
}

#[test]
fn duplicate_explicit_group_is_rejected() {
	let mut index = index();
	index.insert_items([row(1, "a", 1)]).unwrap();

	let err = index.create_group("a", "Again").unwrap_err();
	assert_eq!(err, IndexError::DuplicateGroup(GroupKey::from("a")));
}

#[test]
fn remove_group_drops_members() {
	let mut index = index();
	index.insert_items([row(1, "a", 1), row(2, "b", 1), row(3, "b", 2)]).unwrap();

	let batch = index.remove_group(&GroupKey::from("b"));

	assert_eq!(index.len(), 1);
	assert!(!index.contains(&2));
	assert_eq!(batch.objects_deleted, vec![p(1, 1), p(1, 0)]);
	assert_eq!(batch.groups_deleted, vec![1]);
	assert!(index.remove_group(&GroupKey::from("missing")).is_empty());
}

#[test]
fn remove_all_drops_explicit_groups_too() {
	let mut index = index();
	index.create_group("x", "Explicit").unwrap();
	index.insert_items([row(1, "a", 1)]).unwrap();

	let batch = index.remove_all();

	assert!(index.is_empty());
	assert_eq!(index.group_count(), 0);
	assert_eq!(batch.groups_deleted, vec![1, 0]);
	assert_eq!(batch.objects_deleted, vec![p(1, 0)]);
}

#[test]
fn extractor_failure_skips_item_and_applies_rest() {
	let mut index = index();
	let err = index.insert_items([row(1, "a", 1), row(2, "", 1), row(3, "a", 2)]).unwrap_err();

	let IndexError::ExtractorFailure { failures, applied } = err else {
		panic!("expected extractor failure");
	};
	assert_eq!(failures.len(), 1);
	assert_eq!(failures[0].id, "2");
	assert_eq!(failures[0].error.field, "group");
	assert_eq!(applied.objects_inserted, vec![p(0, 0), p(0, 1)]);
	assert_eq!(index.len(), 2);
}

#[test]
fn sort_field_failure_skips_item_and_applies_rest() {
	let mut index = CollectionIndex::new(
		Grouping::new(|row: &Row| Ok(GroupKey::from(row.key)), |row: &Row| row.key.to_string()),
		ComparatorChain::new().field("rank", Direction::Ascending, |row: &Row| {
			if row.sort < 0 {
				Err(ExtractError::new("rank", "negative rank"))
			} else {
				Ok(SortValue::from(row.sort))
			}
		}),
		IndexOptions::default(),
	);

	let err = index.insert_items([row(1, "a", 2), row(2, "a", -1), row(3, "a", 1)]).unwrap_err();
	let IndexError::ExtractorFailure { failures, applied } = err else {
		panic!("expected extractor failure");
	};
	assert_eq!(failures.len(), 1);
	assert_eq!(failures[0].id, "2");
	assert_eq!(failures[0].error.field, "rank");
	assert_eq!(applied.objects_inserted, vec![p(0, 0), p(0, 1)]);
	assert_eq!(ids(&index, 0), vec![3, 1]);

	let err = index.update_items([row(1, "a", -5), row(3, "a", 9)], false).unwrap_err();
	assert!(matches!(&err, IndexError::ExtractorFailure { failures, .. } if failures[0].error.field == "rank"));
	assert_eq!(ids(&index, 0), vec![1, 3]);
	assert_eq!(index.item_at(p(0, 0)).unwrap().sort, 2);
}

#[test]
fn failed_update_leaves_existing_entry_untouched() {
	let mut index = index();
	index.insert_items([row(1, "a", 1)]).unwrap();

	assert!(index.update_items([row(1, "", 9)], true).is_err());
	assert_eq!(index.item_at(p(0, 0)).unwrap().sort, 1);
}

#[test]
fn path_of_tracks_reverse_index() {
	let mut index = index();
	index.insert_items([row(1, "a", 3), row(2, "b", 1), row(3, "b", 2)]).unwrap();

	assert_eq!(index.path_of(&row(3, "ignored", 0)), Some(p(1, 1)));
	index.remove_item(&2).unwrap();
	assert_eq!(index.path_of_id(&3), Some(p(1, 0)));
	assert_eq!(index.path_of_id(&2), None);
}

#[test]
fn iter_walks_display_order() {
	let mut index = index();
	index.insert_items([row(1, "a", 2), row(2, "b", 1), row(3, "a", 1)]).unwrap();

	let walked: Vec<_> = index.iter().map(|(path, row)| (path, row.id)).collect();
	assert_eq!(walked, vec![(p(0, 0), 3), (p(0, 1), 1), (p(1, 0), 2)]);
}

#[test]
fn unknown_group_queries_default() {
	let index = index();
	assert_eq!(index.item_count(4), 0);
	assert_eq!(index.title_of(4), None);
	assert_eq!(index.group_key(4), None);
}

#[test]
fn subscribers_see_each_batch_once() {
	let mut index = index();
	let seen = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&seen);
	index.subscribe(move |event| sink.borrow_mut().push(event.clone()));

	index.insert_items([row(1, "a", 1)]).unwrap();
	index.insert_items(Vec::<Row>::new()).unwrap();

	assert_eq!(
		*seen.borrow(),
		vec![
			ChangeEvent::BeginUpdate,
			ChangeEvent::GroupsInserted(vec![0]),
			ChangeEvent::ObjectsInserted(vec![p(0, 0)]),
			ChangeEvent::EndUpdate,
		]
	);
}

#[test]
fn group_recreated_in_same_call_is_delete_plus_insert() {
	let mut index = index();
	index.insert_items([row(1, "a", 1), row(2, "b", 1)]).unwrap();
	let mut mirror = Mirror::capture(&index);

	let batch = index.update_items([row(1, "b", 0), row(3, "a", 5)], false).unwrap();

	assert_eq!(batch.groups_deleted, vec![0]);
	assert_eq!(batch.groups_inserted, vec![1]);
	mirror.apply(&batch, &index).unwrap();
	assert_eq!(mirror, Mirror::capture(&index));
}

#[test]
fn round_trip_returns_to_empty() {
	let mut index = index();
	let batch = index.insert_items([row(1, "a", 1), row(2, "b", 2), row(3, "a", 0)]).unwrap();

	index.remove_items_at(batch.objects_inserted.clone()).unwrap();

	assert!(index.is_empty());
	assert_eq!(index.group_count(), 0);
	assert_eq!(index.remove_all(), ChangeBatch::default());
}
