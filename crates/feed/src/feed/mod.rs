//! Feed controller: drives a [`PageFetcher`] and applies its replies to a
//! [`CollectionIndex`] from the owner's serial context.


use std::sync::Arc;

use roster_index::{ChangeBatch, CollectionIndex, IndexError, Record};
use roster_worker::{Generation, GenerationClock, TaskClass};
use rustc_hash::FxHashSet;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::coordinator::{RequestCoordinator, RequestHandle, RequestId, RequestOptions};
use crate::error::{FeedError, FetchError, Result};
use crate::fetch::{Delivery, Page, PageFetcher, PageReply, PageToken};
use crate::options::{FeedOptions, ReconcilePolicy};

/// Lifecycle of the feed's page loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedState {
	/// No request in flight; more pages may exist.
	#[default]
	Idle,
	Loading,
	/// The last final page carried no next token.
	Exhausted,
	/// The last request failed; see [`Feed::last_error`].
	Failed,
}

/// What applying queued deliveries did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
	/// Deliveries applied to the index, errors included.
	pub applied: usize,
	/// Deliveries dropped as belonging to a superseded generation or request.
	pub stale_dropped: usize,
	/// Items not previously in the index that the index accepted.
	pub added: usize,
	/// Items removed by reconciliation.
	pub removed: usize,
	/// Items rejected by the index's extractors.
	pub skipped: usize,
}

impl PumpReport {
	pub fn is_empty(&self) -> bool {
		*self == Self::default()
	}

	fn absorb(&mut self, other: Self) {
		self.applied += other.applied;
		self.stale_dropped += other.stale_dropped;
		self.added += other.added;
		self.removed += other.removed;
		self.skipped += other.skipped;
	}
}

/// The page request currently allowed to touch the index.
struct Active<Id> {
	generation: Generation,
	handle: RequestHandle,
	/// Ids shown by this request's stale delivery.
	provisional: FxHashSet<Id>,
}

/// Paged, stale-then-fresh loader feeding a [`CollectionIndex`].
///
/// The feed is not thread-safe, like its index. Fetches run on the worker
/// runtime; their replies wait in a queue until [`Feed::pump`] or
/// [`Feed::next_delivery`] applies them.
pub struct Feed<T: Record, F> {
	index: CollectionIndex<T>,
	fetcher: Arc<F>,
	coordinator: RequestCoordinator,
	clock: GenerationClock,
	options: FeedOptions,
	tx: UnboundedSender<Delivery<T>>,
	rx: UnboundedReceiver<Delivery<T>>,
	active: Option<Active<T::Id>>,
	next: Option<PageToken>,
	pages: usize,
	state: FeedState,
	last_error: Option<FetchError>,
}

impl<T, F> Feed<T, F>
where
	T: Record + Send + 'static,
	F: PageFetcher<T>,
{
	pub fn new(index: CollectionIndex<T>, fetcher: F, coordinator: RequestCoordinator, options: FeedOptions) -> Self {
		let (tx, rx) = mpsc::unbounded_channel();
		Self {
			index,
			fetcher: Arc::new(fetcher),
			coordinator,
			clock: GenerationClock::new(),
			options,
			tx,
			rx,
			active: None,
			next: None,
			pages: 0,
			state: FeedState::Idle,
			last_error: None,
		}
	}

	pub fn index(&self) -> &CollectionIndex<T> {
		&self.index
	}

	/// Mutable access for subscribing and local edits between deliveries.
	pub fn index_mut(&mut self) -> &mut CollectionIndex<T> {
		&mut self.index
	}

	pub fn into_index(self) -> CollectionIndex<T> {
		self.index
	}

	pub fn coordinator(&self) -> &RequestCoordinator {
		&self.coordinator
	}

	pub fn options(&self) -> &FeedOptions {
		&self.options
	}

	pub fn state(&self) -> FeedState {
		self.state
	}

	/// Failure of the most recent request, kept until a later page succeeds.
	pub fn last_error(&self) -> Option<&FetchError> {
		self.last_error.as_ref()
	}

	pub fn generation(&self) -> Generation {
		self.clock.current()
	}

	/// Final pages applied in the current generation.
	pub fn pages_loaded(&self) -> usize {
		self.pages
	}

	pub fn has_next_page(&self) -> bool {
		self.next.is_some()
	}

	pub fn is_loading(&self) -> bool {
		self.active.is_some()
	}

	/// Starts a new generation and requests the first page.
	///
	/// The previous generation's request is cancelled and anything it still
	/// delivers is dropped.
	pub fn reload(&mut self) -> Result<Generation> {
		let generation = self.clock.advance();
		if let Some(previous) = self.active.take() {
			previous.handle.cancel();
			tracing::debug!(generation = previous.generation.get(), request = previous.handle.id().get(), "feed.reload.superseded");
		}
		self.next = None;
		self.pages = 0;
		self.start(generation, None)?;
		tracing::debug!(generation = generation.get(), "feed.reload");
		Ok(generation)
	}

	/// Requests the page after the last final page.
	///
	/// Returns `Ok(false)` without requesting anything when a page request is
	/// already in flight or no further page exists.
	pub fn load_next_page(&mut self) -> Result<bool> {
		let generation = self.clock.current();
		if generation == Generation::ZERO {
			return Err(FeedError::NotStarted);
		}
		if self.active.is_some() {
			return Ok(false);
		}
		let Some(token) = self.next.clone() else {
			return Ok(false);
		};
		self.start(generation, Some(token))?;
		Ok(true)
	}

	/// Applies every delivery already queued, without waiting.
	pub fn pump(&mut self) -> PumpReport {
		let mut report = PumpReport::default();
		while let Ok(delivery) = self.rx.try_recv() {
			self.apply(delivery, &mut report);
		}
		report
	}

	/// Waits for the next delivery and applies it.
	///
	/// Returns `None` when nothing is in flight and nothing is queued.
	pub async fn next_delivery(&mut self) -> Option<PumpReport> {
		if self.active.is_none() {
			let report = self.pump();
			return (!report.is_empty()).then_some(report);
		}
		let delivery = self.rx.recv().await?;
		let mut report = PumpReport::default();
		self.apply(delivery, &mut report);
		Some(report)
	}

	/// Applies deliveries until no page request is in flight.
	pub async fn settle(&mut self) -> PumpReport {
		let mut total = PumpReport::default();
		while let Some(report) = self.next_delivery().await {
			total.absorb(report);
		}
		total
	}

	fn start(&mut self, generation: Generation, token: Option<PageToken>) -> Result<RequestId> {
		let options = RequestOptions {
			survives_abort_all: self.options.survive_abort_all,
			class: if token.is_none() { TaskClass::Interactive } else { TaskClass::Background },
		};
		let fetcher = Arc::clone(&self.fetcher);
		let tx = self.tx.clone();
		let spawned = self.coordinator.spawn(options, move |ticket| {
			let reply = PageReply::new(generation, ticket, tx);
			async move { fetcher.fetch_page(token, reply).await }
		});
		self.track(generation, spawned)
	}

	/// Records a spawned page request as the active one.
	///
	/// A failed spawn leaves no request in flight, so the feed drops back to
	/// `Idle` and the caller may retry.
	fn track(&mut self, generation: Generation, spawned: std::io::Result<RequestHandle>) -> Result<RequestId> {
		let handle = match spawned {
			Ok(handle) => handle,
			Err(err) => {
				self.active = None;
				self.state = FeedState::Idle;
				tracing::warn!(%err, generation = generation.get(), "feed.request.spawn_failed");
				return Err(err.into());
			}
		};

		let id = handle.id();
		self.active = Some(Active {
			generation,
			handle,
			provisional: FxHashSet::default(),
		});
		self.state = FeedState::Loading;
		tracing::trace!(generation = generation.get(), request = id.get(), "feed.request.started");
		Ok(id)
	}

	fn apply(&mut self, delivery: Delivery<T>, report: &mut PumpReport) {
		let Delivery { generation, request, result } = delivery;
		let current = self.clock.is_current(generation) && self.active.as_ref().is_some_and(|active| active.handle.id() == request);
		if !current {
			report.stale_dropped += 1;
			tracing::debug!(
				generation = generation.get(),
				current = self.clock.current().get(),
				request = request.get(),
				"feed.delivery.stale_dropped"
			);
			return;
		}

		report.applied += 1;
		let is_final = result.is_final;
		match result.outcome {
			Ok(page) if is_final => self.apply_final(page, report),
			Ok(page) => self.apply_stale(page, report),
			Err(error) => self.fail(error),
		}
	}

	fn apply_stale(&mut self, page: Page<T>, report: &mut PumpReport) {
		let ids: Vec<T::Id> = page.items.iter().map(Record::id).collect();
		let fresh = self.absent(&ids);
		let batch = self.index.insert_items(page.items);
		report.skipped += skipped(batch);
		report.added += self.count_present(&fresh);
		if let Some(active) = self.active.as_mut() {
			active.provisional.extend(ids);
		}
		tracing::trace!(items = self.index.len(), "feed.page.stale_applied");
	}

	fn apply_final(&mut self, page: Page<T>, report: &mut PumpReport) {
		let Some(active) = self.active.take() else {
			return;
		};
		let confirmed: FxHashSet<T::Id> = page.items.iter().map(Record::id).collect();
		let fresh = self.absent(&confirmed);
		let batch = self.index.update_items(page.items, false);
		report.skipped += skipped(batch);
		report.added += self.count_present(&fresh);

		if self.options.reconcile == ReconcilePolicy::DropUnconfirmed {
			let paths: Vec<_> = active
				.provisional
				.iter()
				.filter(|id| !confirmed.contains(*id))
				.filter_map(|id| self.index.path_of_id(id))
				.collect();
			if !paths.is_empty() {
				match self.index.remove_items_at(paths) {
					Ok(batch) => report.removed += batch.objects_deleted.len(),
					Err(err) => tracing::warn!(%err, "feed.reconcile.failed"),
				}
			}
		}

		self.next = page.next;
		self.pages += 1;
		self.last_error = None;
		self.state = if self.next.is_some() { FeedState::Idle } else { FeedState::Exhausted };
		tracing::debug!(
			generation = active.generation.get(),
			pages = self.pages,
			items = self.index.len(),
			has_next = self.next.is_some(),
			"feed.page.applied"
		);
	}

	fn fail(&mut self, error: FetchError) {
		self.active = None;
		if error == FetchError::Cancelled {
			self.state = FeedState::Idle;
			tracing::debug!("feed.page.cancelled");
			return;
		}
		tracing::warn!(%error, transient = error.is_transient(), "feed.page.failed");
		self.state = FeedState::Failed;
		self.last_error = Some(error);
	}

	/// Distinct ids the index does not hold yet.
	fn absent<'a>(&self, ids: impl IntoIterator<Item = &'a T::Id>) -> FxHashSet<T::Id>
	where
		T::Id: 'a,
	{
		ids.into_iter().filter(|id| !self.index.contains(id)).cloned().collect()
	}

	/// Counts ids that landed in the index; extractor rejects never do.
	fn count_present(&self, ids: &FxHashSet<T::Id>) -> usize {
		ids.iter().filter(|id| self.index.contains(id)).count()
	}
}

/// Counts items an upsert skipped; the rest of the page was still applied.
fn skipped(result: roster_index::Result<ChangeBatch>) -> usize {
	match result {
		Ok(_) => 0,
		Err(IndexError::ExtractorFailure { failures, .. }) => failures.len(),
		Err(err) => {
			tracing::warn!(%err, "feed.page.index_error");
			0
		}
	}
}

impl<T: Record, F> std::fmt::Debug for Feed<T, F> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Feed")
			.field("generation", &self.clock.current())
			.field("state", &self.state)
			.field("pages", &self.pages)
			.field("next", &self.next)
			.field("index", &self.index)
			.finish_non_exhaustive()
	}
}
