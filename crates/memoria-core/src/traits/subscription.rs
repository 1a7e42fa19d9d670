//! Live subscription stream trait.

use futures_core::Stream;

use crate::Result;
use crate::record::Snapshot;

/// A live stream of snapshots for one path.
///
/// The first item is the current content of the path; every later item is
/// the full content after a change. Dropping the stream ends the subscription.
pub trait Subscription: Stream<Item = Result<Snapshot>> + Send + Unpin {}

impl<T> Subscription for T where T: Stream<Item = Result<Snapshot>> + Send + Unpin {}
