use serde::Deserialize;

/// What a final page does to items its stale delivery showed but it did not confirm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReconcilePolicy {
	/// Keep them; pages only ever add or refresh items.
	#[default]
	KeepAll,
	/// Remove them once the authoritative page arrives.
	DropUnconfirmed,
}

/// Feed behavior knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct FeedOptions {
	pub reconcile: ReconcilePolicy,
	/// Keep page requests alive through [`crate::RequestCoordinator::abort_all`] with `except_flagged`.
	pub survive_abort_all: bool,
}
