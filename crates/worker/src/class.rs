/// Execution classes used for spawn placement and trace fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work whose result is waited on by the list surface right now.
	Interactive,
	/// Prefetching and refreshes that may be aborted freely.
	Background,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
		}
	}
}
