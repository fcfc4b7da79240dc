//! Synthetic course catalog served page by page with a cached copy first.

use std::time::Duration;

use async_trait::async_trait;
use roster_feed::{FetchError, FetchResult, Page, PageFetcher, PageReply, PageToken};
use roster_index::{ComparatorChain, Direction, GroupKey, Grouping, Record, SortValue};

const TERMS: [&str; 3] = ["Fall", "Spring", "Summer"];
const SUBJECTS: [&str; 6] = ["Algebra", "Biology", "Chemistry", "Drawing", "Economics", "French"];

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
	pub id: u64,
	pub name: String,
	pub term: &'static str,
	pub favorite: bool,
}

impl Record for Course {
	type Id = u64;

	fn id(&self) -> u64 {
		self.id
	}
}

/// Groups courses by term, titled with the term name.
pub fn grouping() -> Grouping<Course> {
	Grouping::new(|course: &Course| Ok(GroupKey::from(course.term)), |course: &Course| format!("{} term", course.term))
}

/// Favorites first, then by name, then by id.
pub fn chain() -> ComparatorChain<Course> {
	ComparatorChain::new()
		.descending("favorite", |course: &Course| course.favorite)
		.field("name", Direction::Ascending, |course: &Course| Ok(SortValue::from(course.name.as_str())))
		.ascending("id", |course: &Course| course.id)
}

fn course(id: u64) -> Course {
	let index = usize::try_from(id).unwrap_or_default();
	Course {
		id,
		name: format!("{} {}", SUBJECTS[index % SUBJECTS.len()], 100 + id),
		term: TERMS[index / SUBJECTS.len() % TERMS.len()],
		favorite: id % 7 == 0,
	}
}

/// Paged source whose cache lags the server by `cache_lag` items per page.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
	total: u64,
	page_size: u64,
	cache_lag: u64,
	latency: Duration,
}

impl SyntheticSource {
	pub fn new(total: u64, page_size: u64, latency: Duration) -> Self {
		Self {
			total,
			page_size: page_size.max(1),
			cache_lag: 2,
			latency,
		}
	}

	fn page(&self, offset: u64, len: u64) -> Page<Course> {
		let end = (offset + len).min(self.total);
		let next = (offset + self.page_size < self.total).then(|| PageToken::new(format!("offset:{}", offset + self.page_size)));
		Page::new((offset..end).map(course).collect(), next)
	}
}

fn parse_offset(token: Option<&PageToken>) -> Result<u64, FetchError> {
	let Some(token) = token else {
		return Ok(0);
	};
	token
		.as_str()
		.strip_prefix("offset:")
		.and_then(|offset| offset.parse().ok())
		.ok_or_else(|| FetchError::Decode(format!("bad page token {:?}", token.as_str())))
}

#[async_trait]
impl PageFetcher<Course> for SyntheticSource {
	async fn fetch_page(&self, token: Option<PageToken>, mut reply: PageReply<Course>) {
		let offset = match parse_offset(token.as_ref()) {
			Ok(offset) => offset,
			Err(error) => {
				reply.deliver(FetchResult::failed(error));
				return;
			}
		};

		let cached = self.page(offset, self.page_size.saturating_sub(self.cache_lag));
		if !cached.items.is_empty() {
			tracing::debug!(offset, items = cached.items.len(), "demo.source.cache_hit");
			reply.deliver(FetchResult::stale(cached));
		}

		tokio::select! {
			_ = reply.cancelled() => return,
			_ = tokio::time::sleep(self.latency) => {}
		}
		reply.deliver(FetchResult::fresh(self.page(offset, self.page_size)));
	}
}
