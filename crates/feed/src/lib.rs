//! Page loading for a [`roster_index::CollectionIndex`].
//!
//! A [`PageFetcher`] answers each page request with an optional stale result
//! followed by one final result. Replies are marshalled onto a channel owned
//! by a [`Feed`], which applies them to its index from the caller's serial
//! context and drops completions from superseded reloads.

/// Session-scoped registry of cancellable in-flight requests.
pub mod coordinator;
/// Error types for fetching and feed control.
pub mod error;
/// Feed controller tying a fetcher to an index.
pub mod feed;
/// Page fetcher interface and reply channel.
pub mod fetch;
/// Feed configuration.
pub mod options;
/// Two-phase fetch result contract.
pub mod result;

pub use coordinator::{RequestCoordinator, RequestHandle, RequestId, RequestOptions, RequestTicket};
pub use error::{FeedError, FetchError};
pub use feed::{Feed, FeedState, PumpReport};
pub use fetch::{Page, PageFetcher, PageReply, PageToken};
pub use options::{FeedOptions, ReconcilePolicy};
pub use result::FetchResult;
