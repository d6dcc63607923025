//! Creating sessions and claiming the second seat.
//!
//! The store has no compare-and-set. A joiner writes its seat record, waits
//! one settle interval for competing writes to merge, then reads the seat
//! back. Whoever reads their own record holds the seat.

use std::sync::Arc;

use tracing::{debug, info, warn};
use turnsync_protocol::node::{decode_seat, encode_seat};
use turnsync_protocol::path;
use turnsync_protocol::{RecordError, Seat, SessionId};
use turnsync_runtime::{NodeRef, Store};

use crate::clock::{bounded, now_ms};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::rules::RulesEngine;
use crate::session::GameSession;

/// A successful join.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinResult<S> {
	pub seat: Seat,
	/// Session as known right after the claim, including the new seat.
	pub session: GameSession<S>,
	/// The identity already held `seat` and nothing was written.
	pub rejoined: bool,
}

pub struct SessionRegistry<E: RulesEngine> {
	store: Arc<dyn Store>,
	engine: Arc<E>,
	config: SyncConfig,
}

impl<E: RulesEngine> SessionRegistry<E> {
	pub fn new(store: Arc<dyn Store>, engine: Arc<E>, config: SyncConfig) -> Self {
		Self { store, engine, config }
	}

	pub fn config(&self) -> &SyncConfig {
		&self.config
	}

	pub fn engine(&self) -> &Arc<E> {
		&self.engine
	}

	/// Store node holding session `id`.
	pub fn session_node(&self, id: &SessionId) -> NodeRef {
		NodeRef::at(Arc::clone(&self.store), path::session_path(&self.config.namespace, id))
	}

	/// Creates a session hosted by `identity`, seated green.
	///
	/// The whole record goes out as one put, so peers never see a session
	/// without its state.
	pub async fn create_session(&self, identity: &Identity, host_name: &str) -> Result<GameSession<E::State>> {
		let now = now_ms();
		let id = SessionId::generate(&self.config.session_prefix, now);
		let session = GameSession::new(id.clone(), now, identity.player_info(host_name, now), self.engine.create_game());
		let record = session.encode()?;

		let node = self.session_node(&id);
		bounded(self.config.operation_timeout(), "create session", node.put(record)).await?;

		info!(target = "turnsync.registry", session = %id, host = host_name, path = node.path(), "session created");
		Ok(session)
	}

	/// Claims the gold seat of session `id`.
	///
	/// Returns the seat the identity already holds without writing anything
	/// when it is seated from an earlier join.
	pub async fn join_session(&self, id: &SessionId, identity: &Identity, joiner_name: &str) -> Result<JoinResult<E::State>> {
		let result = bounded(self.config.operation_timeout(), "join session", self.claim_seat(id, identity, joiner_name)).await;
		if let Err(err) = &result {
			warn!(target = "turnsync.registry", session = %id, joiner = joiner_name, error = %err, "join failed");
		}
		result
	}

	async fn claim_seat(&self, id: &SessionId, identity: &Identity, joiner_name: &str) -> Result<JoinResult<E::State>> {
		let node = self.session_node(id);
		let mut session = self.lookup(&node, id).await?;

		if let Some(seat) = identity.seat_in(&session.players) {
			info!(target = "turnsync.registry", session = %id, %seat, "already seated, rejoining");
			return Ok(JoinResult { seat, session, rejoined: true });
		}
		if session.players.is_occupied(Seat::Gold) {
			return Err(Error::SessionFull(id.clone()));
		}

		let seat = Seat::Gold;
		let claim = identity.player_info(joiner_name, now_ms());
		let seat_node = NodeRef::at(Arc::clone(&self.store), path::seat_path(&self.config.namespace, id, seat));
		seat_node.put(encode_seat(&claim)?).await?;
		debug!(target = "turnsync.registry", session = %id, %seat, "seat written, waiting to verify");

		tokio::time::sleep(self.config.seat_settle()).await;
		let holder = decode_seat(seat_node.once().await?.as_ref())?;
		if holder.as_ref() != Some(&claim) {
			let winner = holder.as_ref().map(|info| info.name.as_str()).unwrap_or("<none>");
			info!(target = "turnsync.registry", session = %id, %seat, winner, "seat claimed by another player");
			return Err(Error::SeatTaken { session: id.clone(), seat });
		}

		session.players.set(seat, claim);
		info!(target = "turnsync.registry", session = %id, %seat, joiner = joiner_name, "seat claimed");
		Ok(JoinResult {
			seat,
			session,
			rejoined: false,
		})
	}

	/// Waits for the session record to show up at `node`.
	async fn lookup(&self, node: &NodeRef, id: &SessionId) -> Result<GameSession<E::State>> {
		let mut subscription = node.on()?;
		let mut last_error: Option<RecordError> = None;

		let found = tokio::time::timeout(self.config.lookup_timeout(), async {
			while let Some(event) = subscription.next().await {
				match GameSession::<E::State>::decode(&event.value) {
					Ok(session) => return Some(session),
					Err(err) => {
						debug!(target = "turnsync.registry", session = %id, error = %err, "session record not decodable yet");
						last_error = Some(err);
					}
				}
			}
			None
		})
		.await;
		subscription.off();

		match (found, last_error) {
			(Ok(Some(session)), _) => Ok(session),
			(_, Some(err)) => Err(err.into()),
			(_, None) => Err(Error::SessionNotFound(id.clone())),
		}
	}
}

impl<E: RulesEngine> std::fmt::Debug for SessionRegistry<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SessionRegistry").field("namespace", &self.config.namespace).finish()
	}
}
