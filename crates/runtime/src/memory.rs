//! In-process replicated store.
//!
//! A [`MemoryNetwork`] connects any number of [`MemoryPeer`]s. Each peer keeps
//! its own replica of the graph as a set of leaf fields, every leaf tagged
//! with a Lamport state. A put flattens its value into leaves, applies them
//! to the writer's replica (that is the acknowledgement) and routes them to
//! every other peer.
//!
//! # Merge rule
//!
//! A leaf replaces the current one when its state is higher, or when the
//! states tie and its serialized value sorts higher. The rule is commutative
//! and idempotent, so replicas converge no matter how deliveries are
//! ordered, duplicated or delayed.
//!
//! # Delivery control
//!
//! With [`Delivery::Live`] updates reach online peers inside the writer's put.
//! With [`Delivery::Manual`] (or when either end is disconnected) they wait in
//! a pending queue that tests drain explicitly, in order, reversed, shuffled,
//! duplicated or not at all.
//!
//! # Example
//!
//! ```ignore
//! let network = MemoryNetwork::manual();
//! let a = network.peer("a");
//! let b = network.peer("b");
//!
//! a.put("games/s1/state", json!("...")).await?;
//! assert!(b.once("games/s1").await?.is_none());
//!
//! network.deliver_all();
//! assert!(b.once("games/s1").await?.is_some());
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::{Result, StoreError};
use crate::store::Store;
use crate::subscription::{NodeEvent, Subscription};

/// How updates travel between online peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
	/// Delivered as part of the writer's put.
	#[default]
	Live,
	/// Queued until the network is drained explicitly.
	Manual,
}

/// How a peer answers puts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriteBehavior {
	/// Apply and acknowledge.
	#[default]
	Ack,
	/// Refuse with the given message; nothing is applied.
	Fail(String),
	/// Never acknowledge; nothing is applied.
	Stall,
}

#[derive(Debug, Clone, PartialEq)]
struct Leaf {
	state: u64,
	value: Value,
}

impl Leaf {
	fn beats(&self, other: &Leaf) -> bool {
		match self.state.cmp(&other.state) {
			Ordering::Greater => true,
			Ordering::Less => false,
			Ordering::Equal => self.value.to_string() > other.value.to_string(),
		}
	}
}

type Leaves = Arc<Vec<(String, Leaf)>>;

#[derive(Debug, Default)]
struct Replica {
	clock: u64,
	leaves: BTreeMap<String, Leaf>,
}

impl Replica {
	/// Merges leaves and returns the paths whose value changed.
	fn merge(&mut self, leaves: &[(String, Leaf)]) -> Vec<String> {
		let mut changed = Vec::new();
		for (path, leaf) in leaves {
			self.clock = self.clock.max(leaf.state);
			let current = self.leaves.get(path);
			if current == Some(leaf) || !current.is_none_or(|existing| leaf.beats(existing)) {
				continue;
			}
			self.leaves.insert(path.clone(), leaf.clone());
			changed.push(path.clone());
		}
		changed
	}

	/// Rebuilds the value at `path`. Branches shadow a leaf at the same path.
	fn read(&self, path: &str) -> Option<Value> {
		let prefix = if path.is_empty() { String::new() } else { format!("{path}/") };
		let mut root = Map::new();
		let mut has_children = false;
		for (key, leaf) in self.leaves.range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded)) {
			if !key.starts_with(&prefix) {
				break;
			}
			has_children = true;
			insert_nested(&mut root, &key[prefix.len()..], leaf.value.clone());
		}
		if has_children {
			return Some(Value::Object(root));
		}
		self.leaves.get(path).map(|leaf| leaf.value.clone()).filter(|value| !value.is_null())
	}

	fn all_leaves(&self) -> Vec<(String, Leaf)> {
		self.leaves.iter().map(|(path, leaf)| (path.clone(), leaf.clone())).collect()
	}
}

struct Watcher {
	id: u64,
	path: String,
	tx: mpsc::UnboundedSender<NodeEvent>,
}

struct PeerSlot {
	name: Arc<str>,
	replica: Replica,
	online: bool,
	write_behavior: WriteBehavior,
	writes: u64,
	watchers: Vec<Watcher>,
}

impl PeerSlot {
	fn apply(&mut self, leaves: &[(String, Leaf)]) -> usize {
		let changed = self.replica.merge(leaves);
		if !changed.is_empty() {
			self.notify(&changed);
		}
		changed.len()
	}

	fn notify(&mut self, changed: &[String]) {
		let replica = &self.replica;
		self.watchers.retain(|watcher| {
			if !changed.iter().any(|path| covers(&watcher.path, path)) {
				return true;
			}
			match replica.read(&watcher.path) {
				Some(value) => watcher
					.tx
					.send(NodeEvent {
						key: last_segment(&watcher.path).to_string(),
						value,
					})
					.is_ok(),
				None => !watcher.tx.is_closed(),
			}
		});
	}
}

#[derive(Clone)]
struct Envelope {
	from: usize,
	to: usize,
	leaves: Leaves,
}

#[derive(Default)]
struct NetworkInner {
	peers: Vec<PeerSlot>,
	delivery: Delivery,
	pending: Vec<Envelope>,
	next_watcher: u64,
}

impl NetworkInner {
	fn route(&mut self, from: usize, leaves: Leaves) {
		for to in 0..self.peers.len() {
			if to == from {
				continue;
			}
			let envelope = Envelope {
				from,
				to,
				leaves: Arc::clone(&leaves),
			};
			if self.delivery == Delivery::Live && self.can_deliver(&envelope) {
				self.deliver(envelope);
			} else {
				self.pending.push(envelope);
			}
		}
	}

	fn can_deliver(&self, envelope: &Envelope) -> bool {
		self.peers[envelope.from].online && self.peers[envelope.to].online
	}

	fn deliver(&mut self, envelope: Envelope) {
		let changed = self.peers[envelope.to].apply(&envelope.leaves);
		trace!(
			target = "turnsync.store",
			from = %self.peers[envelope.from].name,
			to = %self.peers[envelope.to].name,
			changed,
			"update delivered"
		);
	}

	fn drain(&mut self, reversed: bool) -> usize {
		let pending = std::mem::take(&mut self.pending);
		let (mut ready, held): (Vec<_>, Vec<_>) = pending.into_iter().partition(|envelope| self.can_deliver(envelope));
		self.pending = held;
		if reversed {
			ready.reverse();
		}
		let count = ready.len();
		for envelope in ready {
			self.deliver(envelope);
		}
		count
	}
}

/// Hub connecting in-process peers.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
	inner: Arc<Mutex<NetworkInner>>,
}

impl MemoryNetwork {
	pub fn new(delivery: Delivery) -> Self {
		let network = Self::default();
		network.inner.lock().delivery = delivery;
		network
	}

	/// Network that delivers inside each put.
	pub fn live() -> Self {
		Self::new(Delivery::Live)
	}

	/// Network that queues everything until drained.
	pub fn manual() -> Self {
		Self::new(Delivery::Manual)
	}

	/// Adds a peer. The new peer starts with a copy of every online peer's
	/// replica, as if it had synced with them on connect.
	pub fn peer(&self, name: &str) -> MemoryPeer {
		let mut inner = self.inner.lock();
		let mut replica = Replica::default();
		let seeds: Vec<(String, Leaf)> = inner
			.peers
			.iter()
			.filter(|peer| peer.online)
			.flat_map(|peer| peer.replica.all_leaves())
			.collect();
		replica.merge(&seeds);

		let name: Arc<str> = Arc::from(name);
		inner.peers.push(PeerSlot {
			name: Arc::clone(&name),
			replica,
			online: true,
			write_behavior: WriteBehavior::Ack,
			writes: 0,
			watchers: Vec::new(),
		});
		debug!(target = "turnsync.store", peer = %name, seeded = seeds.len(), "peer joined network");

		MemoryPeer {
			index: inner.peers.len() - 1,
			name,
			inner: Arc::clone(&self.inner),
		}
	}

	pub fn delivery(&self) -> Delivery {
		self.inner.lock().delivery
	}

	/// Switches the delivery mode. Switching to live does not drain the queue.
	pub fn set_delivery(&self, delivery: Delivery) {
		self.inner.lock().delivery = delivery;
	}

	pub fn pending_count(&self) -> usize {
		self.inner.lock().pending.len()
	}

	/// Delivers every pending update whose ends are online, oldest first.
	pub fn deliver_all(&self) -> usize {
		self.inner.lock().drain(false)
	}

	/// Delivers every pending update whose ends are online, newest first.
	pub fn deliver_reversed(&self) -> usize {
		self.inner.lock().drain(true)
	}

	/// Reorders the pending queue deterministically from `seed`.
	pub fn shuffle_pending(&self, seed: u64) {
		let mut rng = StdRng::seed_from_u64(seed);
		self.inner.lock().pending.shuffle(&mut rng);
	}

	/// Queues a second copy of every pending update.
	pub fn duplicate_pending(&self) {
		let mut inner = self.inner.lock();
		let copies = inner.pending.clone();
		inner.pending.extend(copies);
	}

	/// Discards every pending update.
	pub fn drop_pending(&self) -> usize {
		let mut inner = self.inner.lock();
		let dropped = inner.pending.len();
		inner.pending.clear();
		dropped
	}

	/// Takes `peer` offline. Its writes still apply locally but travel only
	/// after it reconnects, and it receives nothing meanwhile.
	pub fn disconnect(&self, peer: &MemoryPeer) {
		let mut inner = self.inner.lock();
		inner.peers[peer.index].online = false;
		debug!(target = "turnsync.store", peer = %peer.name, "peer disconnected");
	}

	/// Brings `peer` back online. In live mode the updates held for or from it
	/// are delivered immediately; returns how many were delivered.
	pub fn reconnect(&self, peer: &MemoryPeer) -> usize {
		let mut inner = self.inner.lock();
		inner.peers[peer.index].online = true;
		let delivered = if inner.delivery == Delivery::Live { inner.drain(false) } else { 0 };
		debug!(target = "turnsync.store", peer = %peer.name, delivered, "peer reconnected");
		delivered
	}
}

/// One participant's view of a [`MemoryNetwork`].
#[derive(Clone)]
pub struct MemoryPeer {
	index: usize,
	name: Arc<str>,
	inner: Arc<Mutex<NetworkInner>>,
}

impl MemoryPeer {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn is_online(&self) -> bool {
		self.inner.lock().peers[self.index].online
	}

	pub fn set_write_behavior(&self, behavior: WriteBehavior) {
		self.inner.lock().peers[self.index].write_behavior = behavior;
	}

	/// Number of puts this peer has received, including failed and stalled ones.
	pub fn write_count(&self) -> u64 {
		self.inner.lock().peers[self.index].writes
	}

	/// Shares this peer as a trait object.
	pub fn into_store(self) -> Arc<dyn Store> {
		Arc::new(self)
	}
}

impl std::fmt::Debug for MemoryPeer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MemoryPeer").field("name", &self.name).finish()
	}
}

impl Store for MemoryPeer {
	fn put(&self, path: &str, value: Value) -> BoxFuture<'static, Result<()>> {
		let path = normalize(path);
		if path.is_empty() {
			return future::ready(Err(StoreError::InvalidPath(path))).boxed();
		}

		let mut inner = self.inner.lock();
		let peer = &mut inner.peers[self.index];
		peer.writes += 1;
		match &peer.write_behavior {
			WriteBehavior::Ack => {}
			WriteBehavior::Fail(message) => {
				debug!(target = "turnsync.store", peer = %self.name, %path, %message, "put rejected");
				return future::ready(Err(StoreError::Rejected(message.clone()))).boxed();
			}
			WriteBehavior::Stall => {
				debug!(target = "turnsync.store", peer = %self.name, %path, "put stalled");
				return future::pending::<Result<()>>().boxed();
			}
		}

		let mut flat = Vec::new();
		flatten(&path, value, &mut flat);
		peer.replica.clock += 1;
		let state = peer.replica.clock;
		let leaves: Leaves = Arc::new(flat.into_iter().map(|(path, value)| (path, Leaf { state, value })).collect());
		peer.apply(&leaves);
		trace!(target = "turnsync.store", peer = %self.name, %path, state, leaves = leaves.len(), "put applied");

		inner.route(self.index, leaves);
		future::ready(Ok(())).boxed()
	}

	fn once(&self, path: &str) -> BoxFuture<'static, Result<Option<Value>>> {
		let value = self.inner.lock().peers[self.index].replica.read(&normalize(path));
		future::ready(Ok(value)).boxed()
	}

	fn on(&self, path: &str) -> Result<Subscription> {
		let path = normalize(path);
		let (tx, rx) = mpsc::unbounded_channel();

		let mut inner = self.inner.lock();
		let id = inner.next_watcher;
		inner.next_watcher += 1;
		let peer = &mut inner.peers[self.index];
		if let Some(value) = peer.replica.read(&path) {
			let _ = tx.send(NodeEvent {
				key: last_segment(&path).to_string(),
				value,
			});
		}
		peer.watchers.push(Watcher { id, path: path.clone(), tx });
		drop(inner);

		let network = Arc::clone(&self.inner);
		let index = self.index;
		Ok(Subscription::new(path, rx, move || {
			network.lock().peers[index].watchers.retain(|watcher| watcher.id != id);
		}))
	}
}

fn normalize(path: &str) -> String {
	path.split('/').filter(|segment| !segment.is_empty()).collect::<Vec<_>>().join("/")
}

fn last_segment(path: &str) -> &str {
	path.rsplit('/').next().unwrap_or_default()
}

/// Returns true when a change at `changed` is visible from a watcher on `watched`.
fn covers(watched: &str, changed: &str) -> bool {
	watched.is_empty() || changed == watched || (changed.starts_with(watched) && changed.as_bytes().get(watched.len()) == Some(&b'/'))
}

fn flatten(path: &str, value: Value, out: &mut Vec<(String, Value)>) {
	match value {
		Value::Object(map) => {
			for (key, child) in map {
				let child_path = normalize(&format!("{path}/{key}"));
				flatten(&child_path, child, out);
			}
		}
		other => out.push((path.to_string(), other)),
	}
}

fn insert_nested(root: &mut Map<String, Value>, relative: &str, value: Value) {
	let mut segments = relative.split('/').peekable();
	let mut current = root;
	while let Some(segment) = segments.next() {
		if segments.peek().is_none() {
			current.entry(segment.to_string()).or_insert(value);
			return;
		}
		let slot = current.entry(segment.to_string()).or_insert_with(|| Value::Object(Map::new()));
		if !slot.is_object() {
			*slot = Value::Object(Map::new());
		}
		let Value::Object(next) = slot else {
			return;
		};
		current = next;
	}
}
