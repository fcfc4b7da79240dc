use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::error::ExtractError;

/// Field value extracted for ordering.
///
/// Values of different kinds order as `Null < Bool < Int < Float < Text`.
/// Floats use IEEE total ordering so every value compares.
#[derive(Debug, Clone)]
pub enum SortValue {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Text(Arc<str>),
}

impl SortValue {
	const fn rank(&self) -> u8 {
		match self {
			Self::Null => 0,
			Self::Bool(_) => 1,
			Self::Int(_) => 2,
			Self::Float(_) => 3,
			Self::Text(_) => 4,
		}
	}
}

impl Ord for SortValue {
	fn cmp(&self, other: &Self) -> Ordering {
		match (self, other) {
			(Self::Null, Self::Null) => Ordering::Equal,
			(Self::Bool(a), Self::Bool(b)) => a.cmp(b),
			(Self::Int(a), Self::Int(b)) => a.cmp(b),
			(Self::Float(a), Self::Float(b)) => a.total_cmp(b),
			(Self::Text(a), Self::Text(b)) => a.cmp(b),
			_ => self.rank().cmp(&other.rank()),
		}
	}
}

impl PartialOrd for SortValue {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl PartialEq for SortValue {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for SortValue {}

impl From<bool> for SortValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<i64> for SortValue {
	fn from(value: i64) -> Self {
		Self::Int(value)
	}
}

impl From<i32> for SortValue {
	fn from(value: i32) -> Self {
		Self::Int(value.into())
	}
}

impl From<u32> for SortValue {
	fn from(value: u32) -> Self {
		Self::Int(value.into())
	}
}

impl From<u64> for SortValue {
	fn from(value: u64) -> Self {
		Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
	}
}

impl From<f64> for SortValue {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<&str> for SortValue {
	fn from(value: &str) -> Self {
		Self::Text(value.into())
	}
}

impl From<String> for SortValue {
	fn from(value: String) -> Self {
		Self::Text(value.into())
	}
}

impl From<Arc<str>> for SortValue {
	fn from(value: Arc<str>) -> Self {
		Self::Text(value)
	}
}

impl<V: Into<SortValue>> From<Option<V>> for SortValue {
	fn from(value: Option<V>) -> Self {
		value.map_or(Self::Null, Into::into)
	}
}

/// Memoized field values of one item, in chain order.
pub type SortKey = SmallVec<[SortValue; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	Ascending,
	Descending,
}

type ExtractFn<T> = Box<dyn Fn(&T) -> Result<SortValue, ExtractError>>;

struct SortField<T> {
	name: &'static str,
	direction: Direction,
	extract: ExtractFn<T>,
}

/// Ordered list of field comparators.
///
/// Fields are compared left to right and the first non-equal field decides.
/// The chain must be a total order over the items that share a group;
/// equal keys fall back to insertion order, so a chain that cannot tell two
/// distinct records apart keeps them in arrival order rather than failing.
pub struct ComparatorChain<T> {
	fields: Vec<SortField<T>>,
}

impl<T> Default for ComparatorChain<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> ComparatorChain<T> {
	/// Creates an empty chain; every item then orders by insertion.
	pub fn new() -> Self {
		Self { fields: Vec::new() }
	}

	/// Appends a fallible field comparator.
	pub fn field(mut self, name: &'static str, direction: Direction, extract: impl Fn(&T) -> Result<SortValue, ExtractError> + 'static) -> Self {
		self.fields.push(SortField {
			name,
			direction,
			extract: Box::new(extract),
		});
		self
	}

	pub fn ascending<V: Into<SortValue>>(self, name: &'static str, extract: impl Fn(&T) -> V + 'static) -> Self {
		self.field(name, Direction::Ascending, move |item| Ok(extract(item).into()))
	}

	pub fn descending<V: Into<SortValue>>(self, name: &'static str, extract: impl Fn(&T) -> V + 'static) -> Self {
		self.field(name, Direction::Descending, move |item| Ok(extract(item).into()))
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Field names in evaluation order.
	pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
		self.fields.iter().map(|field| field.name)
	}

	/// Extracts the memoized sort key for one item.
	pub fn sort_key(&self, item: &T) -> Result<SortKey, ExtractError> {
		self.fields.iter().map(|field| (field.extract)(item)).collect()
	}

	/// Compares two memoized keys produced by this chain.
	pub fn compare_keys(&self, a: &SortKey, b: &SortKey) -> Ordering {
		for ((field, lhs), rhs) in self.fields.iter().zip(a.iter()).zip(b.iter()) {
			let ordering = match field.direction {
				Direction::Ascending => lhs.cmp(rhs),
				Direction::Descending => rhs.cmp(lhs),
			};
			if ordering != Ordering::Equal {
				return ordering;
			}
		}
		Ordering::Equal
	}

	/// Compares two items directly by extracting their keys.
	pub fn compare(&self, a: &T, b: &T) -> Result<Ordering, ExtractError> {
		Ok(self.compare_keys(&self.sort_key(a)?, &self.sort_key(b)?))
	}
}

impl<T> fmt::Debug for ComparatorChain<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.fields.iter().map(|field| (field.name, field.direction))).finish()
	}
}

/// Effective position key of an entry inside its group.
///
/// Pinned entries (move-to-top) come first, most recently pinned first; then
/// the chain's sort key; then insertion sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrderKey {
	pub pin: u64,
	pub sort: SortKey,
	pub seq: u64,
}

impl<T> ComparatorChain<T> {
	pub(crate) fn compare_order(&self, a: &OrderKey, b: &OrderKey) -> Ordering {
		let pinned = match (a.pin, b.pin) {
			(0, 0) => Ordering::Equal,
			(0, _) => Ordering::Greater,
			(_, 0) => Ordering::Less,
			(lhs, rhs) => rhs.cmp(&lhs),
		};
		pinned.then_with(|| self.compare_keys(&a.sort, &b.sort)).then(a.seq.cmp(&b.seq))
	}
}
