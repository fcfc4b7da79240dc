//! Error types for collection index operations.

use thiserror::Error;

use crate::diff::ChangeBatch;
use crate::grouping::GroupKey;
use crate::path::IndexPath;

/// A group-key or sort-key extractor rejected an item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ExtractError {
	/// Name of the extracted field (`"group"` for the group key).
	pub field: &'static str,
	pub message: String,
}

impl ExtractError {
	pub fn new(field: &'static str, message: impl Into<String>) -> Self {
		Self {
			field,
			message: message.into(),
		}
	}
}

/// One item skipped during a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
	/// Debug rendering of the item's identity.
	pub id: String,
	pub error: ExtractError,
}

/// Errors produced by [`crate::CollectionIndex`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
	/// Stale or out-of-range path. Nothing was mutated.
	#[error("invalid index path {path}")]
	InvalidIndexPath { path: IndexPath },

	/// An explicit group with this key already exists.
	#[error("group {0} already exists")]
	DuplicateGroup(GroupKey),

	/// Some items were skipped by extractors.
	///
	/// Every other item of the call was applied and `applied` was already
	/// published to subscribers.
	#[error("{} item(s) skipped by extractors, first: {}", .failures.len(), first_failure(.failures))]
	ExtractorFailure { failures: Vec<ItemFailure>, applied: ChangeBatch },
}

impl IndexError {
	/// Returns the batch that was applied despite the error, if any.
	pub fn applied(&self) -> Option<&ChangeBatch> {
		match self {
			Self::ExtractorFailure { applied, .. } => Some(applied),
			_ => None,
		}
	}
}

fn first_failure(failures: &[ItemFailure]) -> String {
	failures
		.first()
		.map(|failure| format!("{} ({})", failure.id, failure.error))
		.unwrap_or_default()
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, IndexError>;
