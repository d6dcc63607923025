//! Chainable node references.

use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::store::Store;
use crate::subscription::Subscription;

/// Address of a node in a [`Store`].
///
/// Building a reference is cheap and performs no I/O.
#[derive(Clone)]
pub struct NodeRef {
	store: Arc<dyn Store>,
	path: String,
}

impl NodeRef {
	/// Reference to the root of `store`.
	pub fn root(store: Arc<dyn Store>) -> Self {
		Self { store, path: String::new() }
	}

	/// Reference to an absolute `path` in `store`.
	pub fn at(store: Arc<dyn Store>, path: impl Into<String>) -> Self {
		let path = path.into();
		Self {
			store,
			path: path.trim_matches('/').to_string(),
		}
	}

	/// Child reference. `key` may itself contain `/`.
	pub fn get(&self, key: &str) -> NodeRef {
		let key = key.trim_matches('/');
		let path = match (self.path.is_empty(), key.is_empty()) {
			(true, _) => key.to_string(),
			(_, true) => self.path.clone(),
			_ => format!("{}/{}", self.path, key),
		};
		NodeRef {
			store: Arc::clone(&self.store),
			path,
		}
	}

	pub fn path(&self) -> &str {
		&self.path
	}

	/// Last path segment.
	pub fn key(&self) -> &str {
		self.path.rsplit('/').next().unwrap_or_default()
	}

	pub fn store(&self) -> &Arc<dyn Store> {
		&self.store
	}

	pub async fn put(&self, value: Value) -> Result<()> {
		self.store.put(&self.path, value).await
	}

	pub async fn once(&self) -> Result<Option<Value>> {
		self.store.once(&self.path).await
	}

	pub fn on(&self) -> Result<Subscription> {
		self.store.on(&self.path)
	}
}

impl std::fmt::Debug for NodeRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("NodeRef").field("path", &self.path).finish()
	}
}
