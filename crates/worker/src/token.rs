use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Marker for one logical request lifetime. Later generations supersede earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
	/// Generation preceding every issued one.
	pub const ZERO: Self = Self(0);

	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for Generation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "g{}", self.0)
	}
}

/// Monotonic generation clock shared by a request owner and its workers.
#[derive(Debug, Default, Clone)]
pub struct GenerationClock {
	current: Arc<AtomicU64>,
}

impl GenerationClock {
	/// Creates a clock at [`Generation::ZERO`].
	pub fn new() -> Self {
		Self::default()
	}

	/// Advances the clock and returns the new current generation.
	pub fn advance(&self) -> Generation {
		Generation(self.current.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
	}

	pub fn current(&self) -> Generation {
		Generation(self.current.load(Ordering::Acquire))
	}

	/// Whether `generation` has not been superseded.
	pub fn is_current(&self, generation: Generation) -> bool {
		self.current() == generation
	}
}
