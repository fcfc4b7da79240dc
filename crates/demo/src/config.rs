use std::path::Path;

use anyhow::Context;
use roster_feed::FeedOptions;
use roster_index::IndexOptions;
use serde::Deserialize;

/// On-disk configuration; every table and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RosterConfig {
	pub index: IndexOptions,
	pub feed: FeedOptions,
}

impl RosterConfig {
	pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(text)
	}

	/// Reads `path`, or returns defaults when no path is given.
	pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
		let Some(path) = path else {
			return Ok(Self::default());
		};
		let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
		Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
	}
}
