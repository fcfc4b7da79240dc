use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use roster_worker::{TaskClass, panic_message};
use rustc_hash::FxHashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Identity of one request within a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(u64);

impl RequestId {
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for RequestId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "r{}", self.0)
	}
}

/// Per-request spawn options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
	/// Exempts the request from [`RequestCoordinator::abort_all`] with `except_flagged`.
	pub survives_abort_all: bool,
	pub class: TaskClass,
}

impl Default for RequestOptions {
	fn default() -> Self {
		Self {
			survives_abort_all: false,
			class: TaskClass::Background,
		}
	}
}

/// Registry entry for an in-flight request.
#[derive(Debug, Clone)]
pub struct RequestTicket {
	id: RequestId,
	cancel: CancellationToken,
	survives_abort_all: bool,
}

impl RequestTicket {
	pub const fn id(&self) -> RequestId {
		self.id
	}

	pub fn token(&self) -> &CancellationToken {
		&self.cancel
	}

	pub fn is_cancelled(&self) -> bool {
		self.cancel.is_cancelled()
	}

	pub const fn survives_abort_all(&self) -> bool {
		self.survives_abort_all
	}
}

/// Caller-side handle of a spawned request.
#[derive(Debug)]
pub struct RequestHandle {
	ticket: RequestTicket,
	task: JoinHandle<()>,
}

impl RequestHandle {
	pub const fn id(&self) -> RequestId {
		self.ticket.id
	}

	pub fn cancel(&self) {
		self.ticket.cancel.cancel();
	}

	pub fn is_cancelled(&self) -> bool {
		self.ticket.is_cancelled()
	}

	/// Waits for the request task to end. Yields the panic message if it panicked.
	pub async fn join(self) -> Option<String> {
		match self.task.await {
			Ok(()) => None,
			Err(err) => panic_message(err),
		}
	}
}

#[derive(Debug, Default)]
struct Inner {
	next_id: AtomicU64,
	in_flight: Mutex<FxHashMap<RequestId, RequestTicket>>,
}

/// Session-scoped registry of in-flight requests.
///
/// Clones share one registry. Construct one per session and hand clones to
/// every collaborator that issues requests.
#[derive(Debug, Default, Clone)]
pub struct RequestCoordinator {
	inner: Arc<Inner>,
}

/// Removes a request from the registry when its task ends, including by unwind.
struct Deregister {
	inner: Arc<Inner>,
	id: RequestId,
}

impl Drop for Deregister {
	fn drop(&mut self) {
		self.inner.in_flight.lock().remove(&self.id);
	}
}

impl RequestCoordinator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers a request and runs the future built by `make` on the worker runtime.
	///
	/// The future races the ticket's cancellation and is dropped once it fires.
	pub fn spawn<M, Fut>(&self, options: RequestOptions, make: M) -> io::Result<RequestHandle>
	where
		M: FnOnce(&RequestTicket) -> Fut,
		Fut: Future<Output = ()> + Send + 'static,
	{
		let id = RequestId(self.inner.next_id.fetch_add(1, Ordering::AcqRel).wrapping_add(1));
		let ticket = RequestTicket {
			id,
			cancel: CancellationToken::new(),
			survives_abort_all: options.survives_abort_all,
		};
		let fut = make(&ticket);
		self.inner.in_flight.lock().insert(id, ticket.clone());

		let guard = Deregister {
			inner: Arc::clone(&self.inner),
			id,
		};
		let cancel = ticket.cancel.clone();
		let task = roster_worker::spawn(options.class, async move {
			let _guard = guard;
			tokio::select! {
				biased;
				_ = cancel.cancelled() => tracing::debug!(request = id.0, "coordinator.request.cancelled"),
				_ = fut => tracing::trace!(request = id.0, "coordinator.request.finished"),
			}
		})?;

		tracing::trace!(request = id.0, survives_abort_all = options.survives_abort_all, "coordinator.request.spawned");
		Ok(RequestHandle { ticket, task })
	}

	/// Cancels every in-flight request, sparing opted-out ones when `except_flagged` is set.
	///
	/// Returns how many requests were newly cancelled.
	pub fn abort_all(&self, except_flagged: bool) -> usize {
		let targets: Vec<CancellationToken> = self
			.inner
			.in_flight
			.lock()
			.values()
			.filter(|ticket| !(except_flagged && ticket.survives_abort_all) && !ticket.is_cancelled())
			.map(|ticket| ticket.cancel.clone())
			.collect();

		for token in &targets {
			token.cancel();
		}
		tracing::debug!(cancelled = targets.len(), except_flagged, "coordinator.abort_all");
		targets.len()
	}

	/// Cancels one request. Returns `false` if it is no longer in flight.
	pub fn cancel(&self, id: RequestId) -> bool {
		let token = self.inner.in_flight.lock().get(&id).map(|ticket| ticket.cancel.clone());
		token.inspect(CancellationToken::cancel).is_some()
	}

	pub fn in_flight(&self) -> usize {
		self.inner.in_flight.lock().len()
	}

	pub fn is_in_flight(&self, id: RequestId) -> bool {
		self.inner.in_flight.lock().contains_key(&id)
	}
}
