//! Keeps a participant's cached view of one session in step with the store.
//!
//! The store merges fields independently and delivers them in any order, so
//! every snapshot is decoded as a whole session and run through [`decide`]
//! before it may replace the cache. The ply counter is the only ordering:
//! higher plies win, and at equal ply the first state observed is kept.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};
use turnsync_protocol::SessionId;
use turnsync_runtime::NodeRef;

use crate::error::{Error, Result};
use crate::rules::TurnState;
use crate::session::GameSession;

/// Callback run for every accepted update.
pub type UpdateListener<S> = Arc<dyn Fn(&GameSession<S>) + Send + Sync>;

/// Outcome of offering a snapshot to the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acceptance {
	/// Nothing was cached yet.
	Initial,
	/// The snapshot carries more moves than the cache.
	Advanced { from: u64, to: u64 },
	/// Same move, but a seat was filled or replaced.
	SeatsChanged,
	/// Nothing new.
	Duplicate,
	/// A different state at the cached ply; the cached one is kept.
	Conflict { ply: u64 },
	/// Fewer moves than the cache.
	Stale { cached: u64, incoming: u64 },
	/// The snapshot could not be decoded or breaks a session invariant.
	Invalid(String),
}

impl Acceptance {
	pub fn is_accepted(&self) -> bool {
		matches!(self, Acceptance::Initial | Acceptance::Advanced { .. } | Acceptance::SeatsChanged)
	}
}

/// Classifies `incoming` against the cached session.
pub fn decide<S: TurnState>(cached: Option<&GameSession<S>>, incoming: &GameSession<S>) -> Acceptance {
	let Some(cached) = cached else {
		return Acceptance::Initial;
	};
	if incoming.id != cached.id {
		return Acceptance::Invalid(format!("session id changed from `{}` to `{}`", cached.id, incoming.id));
	}

	let (have, got) = (cached.ply(), incoming.ply());
	if got > have {
		Acceptance::Advanced { from: have, to: got }
	} else if got < have {
		Acceptance::Stale { cached: have, incoming: got }
	} else if incoming.state != cached.state {
		Acceptance::Conflict { ply: got }
	} else if cached.players.overlay(&incoming.players) != cached.players {
		Acceptance::SeatsChanged
	} else {
		Acceptance::Duplicate
	}
}

/// Combines an accepted snapshot with the cache. Seats already seen stay
/// occupied even when the snapshot has them open.
fn merge<S: TurnState>(cached: Option<&GameSession<S>>, mut incoming: GameSession<S>) -> GameSession<S> {
	if let Some(cached) = cached {
		incoming.players = cached.players.overlay(&incoming.players);
		incoming.last_move_at = incoming.last_move_at.or(cached.last_move_at);
	}
	incoming
}

fn validate<S: TurnState>(session: &GameSession<S>) -> std::result::Result<(), String> {
	if session.ply() > 0 && !session.turn_is_seated() {
		return Err(format!("ply {} expects `{}` to move but that seat is open", session.ply(), session.current_turn()));
	}
	Ok(())
}

struct Inner<S: TurnState> {
	session_id: SessionId,
	node: NodeRef,
	cache: watch::Sender<Option<GameSession<S>>>,
	listeners: Mutex<Vec<UpdateListener<S>>>,
}

impl<S: TurnState> Inner<S> {
	fn apply_remote(&self, raw: &Value) -> Acceptance {
		match GameSession::<S>::decode(raw) {
			Ok(incoming) => self.apply(incoming, "remote"),
			Err(err) => {
				warn!(target = "turnsync.sync", session = %self.session_id, error = %err, "dropping malformed update");
				Acceptance::Invalid(err.to_string())
			}
		}
	}

	fn apply(&self, incoming: GameSession<S>, source: &'static str) -> Acceptance {
		if incoming.id != self.session_id {
			let outcome = Acceptance::Invalid(format!("update for session `{}`", incoming.id));
			warn!(target = "turnsync.sync", session = %self.session_id, source, incoming = %incoming.id, "dropping update for another session");
			return outcome;
		}

		let mut outcome = Acceptance::Duplicate;
		let mut accepted = None;
		self.cache.send_if_modified(|cached| {
			let decision = decide(cached.as_ref(), &incoming);
			if !decision.is_accepted() {
				outcome = decision;
				return false;
			}
			let merged = merge(cached.as_ref(), incoming);
			if let Err(reason) = validate(&merged) {
				outcome = Acceptance::Invalid(reason);
				return false;
			}
			*cached = Some(merged.clone());
			accepted = Some(merged);
			outcome = decision;
			true
		});

		match &outcome {
			Acceptance::Initial | Acceptance::Advanced { .. } | Acceptance::SeatsChanged => {
				debug!(target = "turnsync.sync", session = %self.session_id, source, ?outcome, "update accepted");
			}
			Acceptance::Duplicate => {
				trace!(target = "turnsync.sync", session = %self.session_id, source, "duplicate update");
			}
			Acceptance::Stale { cached, incoming } => {
				debug!(target = "turnsync.sync", session = %self.session_id, source, cached, incoming, "stale update ignored");
			}
			Acceptance::Conflict { ply } => {
				warn!(target = "turnsync.sync", session = %self.session_id, source, ply, "conflicting state at cached ply, keeping first observed");
			}
			Acceptance::Invalid(reason) => {
				warn!(target = "turnsync.sync", session = %self.session_id, source, %reason, "dropping invalid update");
			}
		}

		if let Some(session) = accepted {
			let listeners: Vec<UpdateListener<S>> = self.listeners.lock().clone();
			for listener in listeners {
				listener(&session);
			}
		}
		outcome
	}
}

/// Cached, validated view of one session.
///
/// Owned by a [`MatchHandle`](crate::MatchHandle) or a spectator. Dropping it
/// stops the feed.
pub struct StateSynchronizer<S: TurnState> {
	inner: Arc<Inner<S>>,
	feed: Mutex<Option<JoinHandle<()>>>,
}

impl<S: TurnState> StateSynchronizer<S> {
	/// A synchronizer for the session stored at `node`. No I/O until
	/// [`start`](Self::start) or [`subscribe`](Self::subscribe).
	pub fn new(session_id: SessionId, node: NodeRef) -> Self {
		let (cache, _) = watch::channel(None);
		Self {
			inner: Arc::new(Inner {
				session_id,
				node,
				cache,
				listeners: Mutex::new(Vec::new()),
			}),
			feed: Mutex::new(None),
		}
	}

	pub fn session_id(&self) -> &SessionId {
		&self.inner.session_id
	}

	pub fn node(&self) -> &NodeRef {
		&self.inner.node
	}

	pub fn is_subscribed(&self) -> bool {
		self.feed.lock().as_ref().is_some_and(|task| !task.is_finished())
	}

	/// Registers `on_update` and starts the feed if it is not running.
	///
	/// A session that is already cached is handed to `on_update` right away.
	pub async fn subscribe(&self, on_update: impl Fn(&GameSession<S>) + Send + Sync + 'static) -> Result<()> {
		let listener: UpdateListener<S> = Arc::new(on_update);
		self.inner.listeners.lock().push(Arc::clone(&listener));
		if let Some(session) = self.current() {
			listener(&session);
		}
		self.start().await
	}

	/// Starts the feed without a listener. Idempotent.
	pub async fn start(&self) -> Result<()> {
		if self.is_subscribed() {
			return Ok(());
		}
		self.open_feed().await
	}

	/// Stops the feed. Safe to call repeatedly or before any subscribe.
	pub fn unsubscribe(&self) {
		if let Some(task) = self.feed.lock().take() {
			task.abort();
			debug!(target = "turnsync.sync", session = %self.inner.session_id, "unsubscribed");
		}
	}

	/// Restarts the feed with a full read, e.g. after a reconnect.
	pub async fn resync(&self) -> Result<()> {
		self.unsubscribe();
		debug!(target = "turnsync.sync", session = %self.inner.session_id, "resyncing");
		self.open_feed().await
	}

	async fn open_feed(&self) -> Result<()> {
		if let Some(raw) = self.inner.node.once().await? {
			self.inner.apply_remote(&raw);
		}
		let mut subscription = self.inner.node.on()?;

		let inner = Arc::clone(&self.inner);
		let task = tokio::spawn(async move {
			while let Some(event) = subscription.next().await {
				inner.apply_remote(&event.value);
			}
			debug!(target = "turnsync.sync", session = %inner.session_id, "subscription closed");
		});

		if let Some(previous) = self.feed.lock().replace(task) {
			previous.abort();
		}
		Ok(())
	}

	/// Offers a raw store snapshot to the cache.
	pub fn apply_remote(&self, raw: &Value) -> Acceptance {
		self.inner.apply_remote(raw)
	}

	/// Installs a session this participant wrote itself, through the same
	/// acceptance rule as remote updates.
	pub fn apply_local(&self, session: GameSession<S>) -> Acceptance {
		self.inner.apply(session, "local")
	}

	pub fn current(&self) -> Option<GameSession<S>> {
		self.inner.cache.borrow().clone()
	}

	/// Receiver that sees every accepted session.
	pub fn watch(&self) -> watch::Receiver<Option<GameSession<S>>> {
		self.inner.cache.subscribe()
	}

	/// Waits until the cached session satisfies `predicate`.
	pub async fn wait_until(&self, limit: Duration, predicate: impl FnMut(&GameSession<S>) -> bool) -> Result<GameSession<S>> {
		let mut predicate = predicate;
		let mut rx = self.watch();
		let wait = rx.wait_for(|cached| cached.as_ref().is_some_and(&mut predicate));
		match tokio::time::timeout(limit, wait).await {
			Ok(Ok(cached)) => cached.clone().ok_or(Error::NotReady),
			Ok(Err(_)) => Err(Error::NotReady),
			Err(_) => Err(Error::Timeout(format!("session `{}` update after {}ms", self.inner.session_id, limit.as_millis()))),
		}
	}

	/// Waits until the cached session reaches at least `ply`.
	pub async fn wait_for_ply(&self, ply: u64, limit: Duration) -> Result<GameSession<S>> {
		self.wait_until(limit, |session| session.ply() >= ply).await
	}
}

impl<S: TurnState> Drop for StateSynchronizer<S> {
	fn drop(&mut self) {
		self.unsubscribe();
	}
}

impl<S: TurnState> std::fmt::Debug for StateSynchronizer<S> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StateSynchronizer")
			.field("session", &self.inner.session_id)
			.field("path", &self.inner.node.path())
			.field("subscribed", &self.is_subscribed())
			.finish()
	}
}
