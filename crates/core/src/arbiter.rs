//! Local move validation and submission.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use turnsync_protocol::node::encode_state;
use turnsync_protocol::path::field;
use turnsync_runtime::NodeRef;

use crate::clock::{bounded, now_ms};
use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::rules::{RulesEngine, TurnState};
use crate::session::{GameSession, Phase};
use crate::sync::StateSynchronizer;

/// Turns a local move request into a store write.
///
/// Every check runs against the synchronizer's cache before anything is
/// written. Calls on one arbiter are serialized, so two quick moves from the
/// same participant cannot both be computed from the same ply.
pub struct TurnArbiter<E: RulesEngine> {
	engine: Arc<E>,
	node: NodeRef,
	identity: Identity,
	config: SyncConfig,
	in_flight: Mutex<()>,
}

impl<E: RulesEngine> TurnArbiter<E> {
	pub fn new(engine: Arc<E>, node: NodeRef, identity: Identity, config: SyncConfig) -> Self {
		Self {
			engine,
			node,
			identity,
			config,
			in_flight: Mutex::new(()),
		}
	}

	pub fn identity(&self) -> &Identity {
		&self.identity
	}

	/// Validates and submits a move, returning the session after it.
	pub async fn make_move(&self, sync: &StateSynchronizer<E::State>, from: &E::Position, to: &E::Position) -> Result<GameSession<E::State>> {
		let _guard = self.in_flight.lock().await;

		let session = sync.current().ok_or(Error::NotReady)?;
		if session.phase() != Phase::Active {
			return Err(Error::NotReady);
		}
		let seat = self.identity.seat_in(&session.players).ok_or(Error::NotAPlayer)?;
		let turn = session.current_turn();
		if turn != seat {
			debug!(target = "turnsync.arbiter", session = %session.id, %seat, %turn, "move refused, not our turn");
			return Err(Error::NotYourTurn { turn });
		}

		let Some(state) = self.engine.apply_move(&session.state, from, to) else {
			debug!(target = "turnsync.arbiter", session = %session.id, ?from, ?to, "engine rejected move");
			return Err(Error::IllegalMove);
		};
		if state.ply() <= session.ply() {
			error!(target = "turnsync.arbiter", session = %session.id, ply = session.ply(), next = state.ply(), "engine did not advance the ply");
			return Err(Error::IllegalMove);
		}

		let moved_at = now_ms().max(session.last_move_at.unwrap_or(0));
		let next = GameSession {
			state,
			last_move_at: Some(moved_at),
			..session
		};

		let mut update = Map::new();
		update.insert(field::STATE.to_string(), encode_state(&next.state)?);
		update.insert(field::LAST_MOVE_AT.to_string(), Value::from(moved_at));
		bounded(self.config.operation_timeout(), "move write", self.node.put(Value::Object(update))).await?;

		sync.apply_local(next.clone());
		info!(target = "turnsync.arbiter", session = %next.id, %seat, ply = next.ply(), ?from, ?to, "move submitted");
		Ok(next)
	}
}

impl<E: RulesEngine> std::fmt::Debug for TurnArbiter<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TurnArbiter").field("path", &self.node.path()).field("identity", &self.identity.id()).finish()
	}
}
