//! Worker primitives shared by request orchestration.
//!
//! Tasks are spawned on the ambient tokio runtime when one is entered, or on
//! a small process-wide fallback runtime otherwise. Results produced by these
//! tasks are tagged with a [`Generation`] so consumers can drop completions
//! from superseded requests.

/// Execution classes for spawned work.
mod class;
/// Runtime entry for spawned tasks.
mod spawn;
/// Generation clocks for stale-result suppression.
mod token;

pub use class::TaskClass;
pub use spawn::{panic_message, spawn};
pub use token::{Generation, GenerationClock};
