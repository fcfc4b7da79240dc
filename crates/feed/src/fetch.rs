use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use roster_worker::Generation;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

use crate::coordinator::{RequestId, RequestTicket};
use crate::error::FetchError;
use crate::result::FetchResult;

/// Opaque continuation token issued by the backend.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PageToken(Arc<str>);

impl PageToken {
	pub fn new(token: impl Into<Arc<str>>) -> Self {
		Self(token.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for PageToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "PageToken({:?})", &*self.0)
	}
}

/// One page of items and the token of the page after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
	pub items: Vec<T>,
	pub next: Option<PageToken>,
}

impl<T> Page<T> {
	pub fn new(items: Vec<T>, next: Option<PageToken>) -> Self {
		Self { items, next }
	}

	/// A page with no successor.
	pub fn last(items: Vec<T>) -> Self {
		Self { items, next: None }
	}
}

/// Backend collaborator producing pages.
///
/// Implementations answer through `reply`: optionally one
/// [`FetchResult::stale`] with cached data, then exactly one final result.
/// Timeouts are the fetcher's concern. A fetch may be dropped at any await
/// point once its request is cancelled.
#[async_trait]
pub trait PageFetcher<T: Send + 'static>: Send + Sync + 'static {
	async fn fetch_page(&self, token: Option<PageToken>, reply: PageReply<T>);
}

/// A reply tagged with the request that produced it.
#[derive(Debug)]
pub(crate) struct Delivery<T> {
	pub generation: Generation,
	pub request: RequestId,
	pub result: FetchResult<Page<T>>,
}

/// Completion channel handed to a [`PageFetcher`] for one request.
///
/// Results are queued for the owning feed, which applies them on its own
/// context. Dropping the reply before a final result delivers
/// [`FetchError::Cancelled`] if the request was cancelled and
/// [`FetchError::Abandoned`] otherwise.
pub struct PageReply<T> {
	generation: Generation,
	request: RequestId,
	cancel: CancellationToken,
	tx: UnboundedSender<Delivery<T>>,
	finished: bool,
}

impl<T> PageReply<T> {
	pub(crate) fn new(generation: Generation, ticket: &RequestTicket, tx: UnboundedSender<Delivery<T>>) -> Self {
		Self {
			generation,
			request: ticket.id(),
			cancel: ticket.token().clone(),
			tx,
			finished: false,
		}
	}

	pub fn generation(&self) -> Generation {
		self.generation
	}

	pub fn request(&self) -> RequestId {
		self.request
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	/// Resolves once the request is cancelled.
	pub async fn cancelled(&self) {
		self.cancel.cancelled().await;
	}

	/// Queues one result for the feed.
	///
	/// Returns `false` when the result was discarded: a final result was
	/// already delivered, or the feed is gone.
	pub fn deliver(&mut self, result: FetchResult<Page<T>>) -> bool {
		if self.finished {
			tracing::debug!(request = self.request.get(), generation = self.generation.get(), "fetch.reply.after_final");
			return false;
		}
		self.finished = result.is_final;
		self.send(result)
	}

	fn send(&self, result: FetchResult<Page<T>>) -> bool {
		self.tx
			.send(Delivery {
				generation: self.generation,
				request: self.request,
				result,
			})
			.is_ok()
	}
}

impl<T> Drop for PageReply<T> {
	fn drop(&mut self) {
		if self.finished {
			return;
		}
		let error = if self.cancel.is_cancelled() { FetchError::Cancelled } else { FetchError::Abandoned };
		tracing::trace!(request = self.request.get(), %error, "fetch.reply.unfinished");
		self.send(FetchResult::failed(error));
	}
}

impl<T> fmt::Debug for PageReply<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PageReply")
			.field("generation", &self.generation)
			.field("request", &self.request)
			.field("finished", &self.finished)
			.finish_non_exhaustive()
	}
}
