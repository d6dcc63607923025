//! Persistent subscriptions to a store node.

use serde_json::Value;
use tokio::sync::mpsc;

/// A change notification for a subscribed node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvent {
	/// Last segment of the subscribed path.
	pub key: String,
	/// Full current value of the subscribed node.
	pub value: Value,
}

/// Receiving half of an `on` subscription.
///
/// Dropping the subscription cancels it.
pub struct Subscription {
	path: String,
	rx: mpsc::UnboundedReceiver<NodeEvent>,
	cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
	/// Wraps a backend channel. `cancel` runs exactly once, on the first
	/// [`off`](Self::off) or on drop.
	pub fn new(path: impl Into<String>, rx: mpsc::UnboundedReceiver<NodeEvent>, cancel: impl FnOnce() + Send + 'static) -> Self {
		Self {
			path: path.into(),
			rx,
			cancel: Some(Box::new(cancel)),
		}
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	pub fn is_active(&self) -> bool {
		self.cancel.is_some()
	}

	/// Waits for the next event. Returns `None` once cancelled or when the
	/// backend goes away.
	pub async fn next(&mut self) -> Option<NodeEvent> {
		if !self.is_active() {
			return None;
		}
		self.rx.recv().await
	}

	/// Cancels the subscription. Idempotent.
	pub fn off(&mut self) {
		if let Some(cancel) = self.cancel.take() {
			cancel();
			self.rx.close();
		}
	}
}

impl Drop for Subscription {
	fn drop(&mut self) {
		self.off();
	}
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("path", &self.path)
			.field("active", &self.is_active())
			.finish()
	}
}
