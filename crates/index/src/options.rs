use serde::Deserialize;

/// Behavior switches for [`crate::CollectionIndex`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct IndexOptions {
	/// Destroy explicitly created groups once a removal empties them, the
	/// same way implicit groups are destroyed. Explicit groups created empty
	/// stay until something is inserted and later removed.
	pub prune_empty_explicit_groups: bool,
}
