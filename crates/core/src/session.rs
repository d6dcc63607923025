//! The typed session model.

use serde::Serialize;
use serde_json::Value;
use turnsync_protocol::node::SessionNode;
use turnsync_protocol::{PlayerInfo, Players, RecordError, Seat, SessionId};

use crate::rules::TurnState;

/// Whether a session can take moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
	/// Only the host is seated.
	Waiting,
	/// Both seats are filled.
	Active,
}

/// One match as seen by a participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSession<S> {
	pub id: SessionId,
	pub created_at: i64,
	pub players: Players,
	pub state: S,
	/// Informational only; never used to order updates.
	pub last_move_at: Option<i64>,
}

impl<S: TurnState> GameSession<S> {
	/// A fresh session with `host` in the green seat.
	pub fn new(id: SessionId, created_at: i64, host: PlayerInfo, state: S) -> Self {
		Self {
			id,
			created_at,
			players: Players::hosted_by(host),
			state,
			last_move_at: None,
		}
	}

	pub fn ply(&self) -> u64 {
		self.state.ply()
	}

	pub fn current_turn(&self) -> Seat {
		self.state.current_turn()
	}

	pub fn phase(&self) -> Phase {
		if self.players.is_full() { Phase::Active } else { Phase::Waiting }
	}

	/// True when the seat expected to move is occupied.
	pub fn turn_is_seated(&self) -> bool {
		self.players.is_occupied(self.current_turn())
	}

	pub fn from_node(node: SessionNode) -> Result<Self, RecordError> {
		let state = serde_json::from_value(node.state)?;
		Ok(Self {
			id: node.id,
			created_at: node.created_at,
			players: node.players,
			state,
			last_move_at: node.last_move_at,
		})
	}

	pub fn to_node(&self) -> Result<SessionNode, RecordError> {
		Ok(SessionNode {
			id: self.id.clone(),
			created_at: self.created_at,
			players: self.players.clone(),
			state: serde_json::to_value(&self.state)?,
			last_move_at: self.last_move_at,
		})
	}

	/// Decodes a raw session snapshot read from the store.
	pub fn decode(raw: &Value) -> Result<Self, RecordError> {
		Self::from_node(SessionNode::decode(raw)?)
	}

	/// Encodes the session for a single put.
	pub fn encode(&self) -> Result<Value, RecordError> {
		self.to_node()?.encode()
	}
}
