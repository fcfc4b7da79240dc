use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use crate::error::ExtractError;

/// Identity of an item, used for upserts and reverse lookups.
///
/// Two items with equal ids are the same logical record; the index never
/// holds both.
pub trait Record {
	type Id: Clone + Eq + Hash + fmt::Debug;

	fn id(&self) -> Self::Id;
}

/// Cheap-clone group identity.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupKey(Arc<str>);

impl GroupKey {
	pub fn new(key: impl Into<Arc<str>>) -> Self {
		Self(key.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for GroupKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(&*self.0, f)
	}
}

impl fmt::Display for GroupKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for GroupKey {
	fn from(key: &str) -> Self {
		Self(key.into())
	}
}

impl From<String> for GroupKey {
	fn from(key: String) -> Self {
		Self(key.into())
	}
}

type KeyFn<T> = Box<dyn Fn(&T) -> Result<GroupKey, ExtractError>>;
type TitleFn<T> = Box<dyn Fn(&T) -> String>;

/// Group key and title extractors.
///
/// Both functions must be pure. `key_of` runs once per upsert and the result
/// is memoized with the entry. `title_of` may run at any time against any
/// current member of an implicit group.
pub struct Grouping<T> {
	key_of: KeyFn<T>,
	title_of: TitleFn<T>,
}

impl<T> Grouping<T> {
	pub fn new(key_of: impl Fn(&T) -> Result<GroupKey, ExtractError> + 'static, title_of: impl Fn(&T) -> String + 'static) -> Self {
		Self {
			key_of: Box::new(key_of),
			title_of: Box::new(title_of),
		}
	}

	/// Infallible key extractor whose titles repeat the key.
	pub fn by_key(key_of: impl Fn(&T) -> GroupKey + 'static) -> Self {
		let key_of = Arc::new(key_of);
		let title_key = Arc::clone(&key_of);
		Self::new(move |item| Ok((*key_of)(item)), move |item| (*title_key)(item).to_string())
	}

	/// Puts every item into one group.
	pub fn single(key: impl Into<GroupKey>, title: impl Into<String>) -> Self {
		let key = key.into();
		let title = title.into();
		Self::new(move |_| Ok(key.clone()), move |_| title.clone())
	}

	pub fn key_of(&self, item: &T) -> Result<GroupKey, ExtractError> {
		(self.key_of)(item)
	}

	pub fn title_of(&self, item: &T) -> String {
		(self.title_of)(item)
	}
}

impl<T> fmt::Debug for Grouping<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Grouping").finish_non_exhaustive()
	}
}
