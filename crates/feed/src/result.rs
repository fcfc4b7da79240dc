use crate::error::FetchError;

/// One delivery of a two-phase fetch.
///
/// A request yields at most one non-final result (cached, possibly stale)
/// followed by exactly one final result. Errors are always final.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult<V> {
	pub is_final: bool,
	pub outcome: Result<V, FetchError>,
}

impl<V> FetchResult<V> {
	/// Cached value shown while the authoritative one is loading.
	pub fn stale(value: V) -> Self {
		Self {
			is_final: false,
			outcome: Ok(value),
		}
	}

	/// Authoritative value; terminates the request.
	pub fn fresh(value: V) -> Self {
		Self {
			is_final: true,
			outcome: Ok(value),
		}
	}

	pub fn failed(error: FetchError) -> Self {
		Self {
			is_final: true,
			outcome: Err(error),
		}
	}

	pub fn value(&self) -> Option<&V> {
		self.outcome.as_ref().ok()
	}

	pub fn error(&self) -> Option<&FetchError> {
		self.outcome.as_ref().err()
	}

	pub fn map<U>(self, f: impl FnOnce(V) -> U) -> FetchResult<U> {
		FetchResult {
			is_final: self.is_final,
			outcome: self.outcome.map(f),
		}
	}
}
