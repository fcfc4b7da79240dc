//! Roster demo binary.
//!
//! Loads a synthetic course catalog page by page through a [`Feed`], logging
//! every diff batch the index emits, then prints the resulting sections.

mod config;
mod source;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use roster_feed::{Feed, FeedState, RequestCoordinator};
use roster_index::{ChangeEvent, CollectionIndex};
use tracing::info;

use crate::config::RosterConfig;
use crate::source::SyntheticSource;

/// Demo command line arguments.
#[derive(Parser, Debug)]
#[command(name = "roster-demo")]
#[command(about = "Page a synthetic course catalog through a grouped roster index")]
struct Args {
	/// Total courses on the synthetic server
	#[arg(long, default_value_t = 40)]
	courses: u64,

	/// Courses per page
	#[arg(long, default_value_t = 12)]
	page_size: u64,

	/// Stop after this many pages
	#[arg(long)]
	pages: Option<usize>,

	/// Simulated network latency in milliseconds
	#[arg(long, default_value_t = 50)]
	latency_ms: u64,

	/// TOML file with `[index]` and `[feed]` tables
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	let config = RosterConfig::load(args.config.as_deref())?;
	info!(?config, "starting roster-demo");

	let coordinator = RequestCoordinator::new();
	let source = SyntheticSource::new(args.courses, args.page_size, Duration::from_millis(args.latency_ms));
	let index = CollectionIndex::new(source::grouping(), source::chain(), config.index);
	let mut feed = Feed::new(index, source, coordinator.clone(), config.feed);
	feed.index_mut().subscribe(|event| match event {
		ChangeEvent::BeginUpdate | ChangeEvent::EndUpdate => tracing::trace!(?event, "demo.diff"),
		_ => tracing::debug!(?event, "demo.diff"),
	});

	let generation = feed.reload()?;
	info!(%generation, "reload issued");
	loop {
		let report = feed.settle().await;
		info!(
			pages = feed.pages_loaded(),
			items = feed.index().len(),
			groups = feed.index().group_count(),
			added = report.added,
			stale_dropped = report.stale_dropped,
			"page settled"
		);
		if let Some(error) = feed.last_error() {
			tracing::warn!(%error, "showing last good state");
			break;
		}
		if args.pages.is_some_and(|limit| feed.pages_loaded() >= limit) || !feed.load_next_page()? {
			break;
		}
	}

	let aborted = coordinator.abort_all(true);
	info!(aborted, exhausted = feed.state() == FeedState::Exhausted, "done");

	let index = feed.index();
	for group in 0..index.group_count() {
		println!("{} ({})", index.title_of(group).unwrap_or_default(), index.item_count(group));
		for course in index.items(group) {
			let marker = if course.favorite { "*" } else { " " };
			println!("  {marker} {:>4}  {}", course.id, course.name);
		}
	}
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_env("ROSTER_LOG").unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("roster_demo=trace,roster_feed=trace,roster_index=trace,roster_worker=debug,info")
		} else {
			EnvFilter::new("roster_demo=info,roster_feed=info,warn")
		}
	});

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).with_target(true).init();
}
