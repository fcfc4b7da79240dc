use std::io;

use thiserror::Error;

/// Failure reported by a page fetch through the result contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
	#[error("network failure: {0}")]
	Network(String),
	#[error("unexpected status {0}")]
	Status(u16),
	#[error("malformed page: {0}")]
	Decode(String),
	/// The request was cancelled before a final result was delivered.
	#[error("request cancelled")]
	Cancelled,
	/// The fetcher released its reply without delivering a final result.
	#[error("fetcher dropped the request without a final result")]
	Abandoned,
}

impl FetchError {
	/// Whether retrying the same page could plausibly succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Network(_) | Self::Abandoned => true,
			Self::Status(status) => *status >= 500 || *status == 429,
			Self::Decode(_) | Self::Cancelled => false,
		}
	}
}

/// Failure starting a feed request.
#[derive(Debug, Error)]
pub enum FeedError {
	#[error("no page has been requested yet; call reload first")]
	NotStarted,
	#[error("failed to spawn page request: {0}")]
	Spawn(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, FeedError>;
