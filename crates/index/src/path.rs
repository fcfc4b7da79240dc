use std::fmt;

/// Logical `(group, item)` locator.
///
/// Paths are only meaningful against the index state they were read from;
/// any mutation invalidates previously obtained paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IndexPath {
	pub group: usize,
	pub item: usize,
}

impl IndexPath {
	pub const fn new(group: usize, item: usize) -> Self {
		Self { group, item }
	}
}

impl From<(usize, usize)> for IndexPath {
	fn from((group, item): (usize, usize)) -> Self {
		Self { group, item }
	}
}

impl fmt::Display for IndexPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "({}, {})", self.group, self.item)
	}
}
