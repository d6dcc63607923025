//! Caller-owned entry points.
//!
//! A [`MatchClient`] is a factory bound to one store, one rules engine and one
//! identity. Each [`MatchHandle`] it returns owns the synchronizer and arbiter
//! of a single match; handles are independent of each other and stop syncing
//! when dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::info;
use turnsync_protocol::{Seat, SessionId};
use turnsync_runtime::Store;

use crate::arbiter::TurnArbiter;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::identity::Identity;
use crate::registry::{JoinResult, SessionRegistry};
use crate::rules::RulesEngine;
use crate::session::GameSession;
use crate::sync::StateSynchronizer;

pub struct MatchClient<E: RulesEngine> {
	registry: SessionRegistry<E>,
	identity: Identity,
}

impl<E: RulesEngine> MatchClient<E> {
	pub fn new(store: Arc<dyn Store>, engine: Arc<E>, identity: Identity, config: SyncConfig) -> Self {
		Self {
			registry: SessionRegistry::new(store, engine, config),
			identity,
		}
	}

	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	pub fn registry(&self) -> &SessionRegistry<E> {
		&self.registry
	}

	/// Hosts a new match in the green seat.
	pub async fn create(&self, host_name: &str) -> Result<MatchHandle<E>> {
		let session = self.registry.create_session(&self.identity, host_name).await?;
		self.attach(session, Seat::Green).await
	}

	/// Joins an existing match, or reattaches to a seat this identity
	/// already holds.
	pub async fn join(&self, id: &SessionId, name: &str) -> Result<MatchHandle<E>> {
		let JoinResult { seat, session, .. } = self.registry.join_session(id, &self.identity, name).await?;
		self.attach(session, seat).await
	}

	/// Follows a match without taking a seat.
	pub async fn observe(&self, id: &SessionId) -> Result<StateSynchronizer<E::State>> {
		let sync = StateSynchronizer::new(id.clone(), self.registry.session_node(id));
		sync.start().await?;
		info!(target = "turnsync.client", session = %id, "observing");
		Ok(sync)
	}

	async fn attach(&self, session: GameSession<E::State>, seat: Seat) -> Result<MatchHandle<E>> {
		let id = session.id.clone();
		let node = self.registry.session_node(&id);
		let sync = StateSynchronizer::new(id.clone(), node.clone());
		sync.apply_local(session);
		sync.start().await?;

		let arbiter = TurnArbiter::new(Arc::clone(self.registry.engine()), node, self.identity.clone(), self.registry.config().clone());
		Ok(MatchHandle {
			id,
			seat,
			sync,
			arbiter,
			timeout: self.registry.config().operation_timeout(),
		})
	}
}

impl<E: RulesEngine> std::fmt::Debug for MatchClient<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MatchClient").field("identity", &self.identity.id()).field("registry", &self.registry).finish()
	}
}

/// One seated participant's view of one match.
pub struct MatchHandle<E: RulesEngine> {
	id: SessionId,
	seat: Seat,
	sync: StateSynchronizer<E::State>,
	arbiter: TurnArbiter<E>,
	timeout: Duration,
}

impl<E: RulesEngine> MatchHandle<E> {
	pub fn id(&self) -> &SessionId {
		&self.id
	}

	pub fn local_seat(&self) -> Seat {
		self.seat
	}

	pub fn current(&self) -> Option<GameSession<E::State>> {
		self.sync.current()
	}

	pub fn watch(&self) -> watch::Receiver<Option<GameSession<E::State>>> {
		self.sync.watch()
	}

	pub fn synchronizer(&self) -> &StateSynchronizer<E::State> {
		&self.sync
	}

	/// Runs `on_update` with the current session, then for every accepted
	/// update after it.
	pub async fn subscribe(&self, on_update: impl Fn(&GameSession<E::State>) + Send + Sync + 'static) -> Result<()> {
		self.sync.subscribe(on_update).await
	}

	pub async fn make_move(&self, from: &E::Position, to: &E::Position) -> Result<GameSession<E::State>> {
		self.arbiter.make_move(&self.sync, from, to).await
	}

	pub async fn resync(&self) -> Result<()> {
		self.sync.resync().await
	}

	/// Waits, up to the operation timeout, for the match to reach `ply`.
	pub async fn wait_for_ply(&self, ply: u64) -> Result<GameSession<E::State>> {
		self.sync.wait_for_ply(ply, self.timeout).await
	}

	/// Waits, up to the operation timeout, for the opponent to take a seat.
	pub async fn wait_for_opponent(&self) -> Result<GameSession<E::State>> {
		self.sync.wait_until(self.timeout, |session| session.players.is_full()).await
	}

	/// Stops syncing. The seat stays taken in the store.
	pub fn leave(self) {
		self.sync.unsubscribe();
		info!(target = "turnsync.client", session = %self.id, seat = %self.seat, "left match");
	}
}

impl<E: RulesEngine> std::fmt::Debug for MatchHandle<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("MatchHandle")
			.field("id", &self.id)
			.field("seat", &self.seat)
			.field("sync", &self.sync)
			.field("arbiter", &self.arbiter)
			.finish()
	}
}
