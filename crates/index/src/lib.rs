//! Grouped, sorted collection index for paginated list surfaces.
//!
//! Items are bucketed into groups by a key extractor and kept ordered inside
//! each group by a comparator chain. Every mutating call produces one
//! [`ChangeBatch`] whose phases can be replayed index-by-index by a list
//! surface mirroring the collection.

/// Synchronous change-event subscribers.
pub mod bus;
/// Change batches, event ordering, and a reference mirror.
pub mod diff;
/// Error taxonomy for index operations.
pub mod error;
/// Group storage and group identity.
pub mod group;
/// Group key/title extractors and item identity.
pub mod grouping;
/// The collection index itself.
pub mod index;
/// Configuration for index behavior.
pub mod options;
/// Transient `(group, item)` locators.
pub mod path;
/// Comparator chains and memoized sort keys.
pub mod sort;

pub use bus::{EventBus, SubscriptionId};
pub use diff::{ChangeBatch, ChangeEvent, Mirror};
pub use error::{ExtractError, IndexError, ItemFailure, Result};
pub use group::{Group, GroupOrigin};
pub use grouping::{GroupKey, Grouping, Record};
pub use index::CollectionIndex;
pub use options::IndexOptions;
pub use path::IndexPath;
pub use sort::{ComparatorChain, Direction, SortKey, SortValue};
