use std::any::Any;
use std::future::Future;
use std::io;
use std::sync::OnceLock;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::{JoinError, JoinHandle};

use crate::TaskClass;

static GLOBAL_RT: OnceLock<Runtime> = OnceLock::new();

/// Handle of the entered runtime, or of the lazily built fallback runtime.
fn runtime_handle() -> io::Result<Handle> {
	if let Ok(handle) = Handle::try_current() {
		return Ok(handle);
	}
	if let Some(runtime) = GLOBAL_RT.get() {
		return Ok(runtime.handle().clone());
	}

	let runtime = Builder::new_multi_thread().enable_all().worker_threads(2).thread_name("roster-worker-global").build()?;
	// A racing initializer may have won; its runtime is kept and ours dropped.
	Ok(GLOBAL_RT.get_or_init(|| runtime).handle().clone())
}

/// Spawns an async task tagged with its execution class.
pub fn spawn<F>(class: TaskClass, fut: F) -> io::Result<JoinHandle<F::Output>>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(worker_class = class.as_str(), "worker.spawn");
	Ok(runtime_handle()?.spawn(fut))
}

/// Panic payload of a failed task, or `None` when the task was cancelled.
pub fn panic_message(err: JoinError) -> Option<String> {
	let payload: Box<dyn Any + Send> = err.try_into_panic().ok()?;
	match payload.downcast::<String>() {
		Ok(message) => Some(*message),
		Err(payload) => Some(payload.downcast_ref::<&'static str>().map_or_else(|| "<non-string panic>".to_string(), |s| (*s).to_string())),
	}
}
