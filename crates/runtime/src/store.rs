//! The store trait implemented by concrete backends.

use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::error::Result;
use crate::subscription::Subscription;

/// Backend contract for a path-addressed, eventually-consistent store.
///
/// Paths are `/`-separated. Object values are merged field by field into the
/// node at `path`; every other value replaces a single field.
pub trait Store: Send + Sync + 'static {
	/// Writes `value` at `path`. The returned future resolves when the write is
	/// durable locally or has been handed to the transport, not when other
	/// peers have seen it.
	fn put(&self, path: &str, value: Value) -> BoxFuture<'static, Result<()>>;

	/// Reads the current, possibly stale, value at `path`.
	fn once(&self, path: &str) -> BoxFuture<'static, Result<Option<Value>>>;

	/// Opens a persistent subscription to `path`. Events fire on local and
	/// remote changes below `path`, at least once, without cross-peer ordering.
	fn on(&self, path: &str) -> Result<Subscription>;
}
