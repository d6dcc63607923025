//! Node codec for session records.
//!
//! A session is stored as a node with one child per field:
//!
//! ```json
//! {
//!   "id": "match-1700000000000-k3j2h1g0f9",
//!   "createdAt": 1700000000000,
//!   "players": {
//!     "green": "{\"id\":\"anon-1\",\"pub\":\"anon-1\",\"name\":\"Ada\",\"joinedAt\":1700000000000}",
//!     "gold": "{\"id\":\"anon-2\",\"pub\":\"anon-2\",\"name\":\"Lin\",\"joinedAt\":1700000000500}"
//!   },
//!   "state": "{\"ply\":0,\"turn\":\"green\",...}",
//!   "lastMoveAt": 1700000001000
//! }
//! ```
//!
//! Seats and state are JSON blobs rather than nested nodes. The store merges
//! per field, so a blob is the unit that can never be torn between two
//! concurrent writers. Decoding also accepts inline objects for both.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::path::field;
use crate::player::{PlayerInfo, Players};
use crate::seat::Seat;
use crate::session_id::SessionId;

/// Structural problems found while decoding a session node.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
	#[error("session node is not an object")]
	NotAnObject,
	#[error("missing field `{0}`")]
	MissingField(&'static str),
	#[error("field `{field}` is malformed: {reason}")]
	Malformed { field: &'static str, reason: String },
	#[error("invalid session id `{0}`")]
	InvalidSessionId(String),
	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

/// Decoded form of a session node, with the game state still untyped.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionNode {
	pub id: SessionId,
	pub created_at: i64,
	pub players: Players,
	pub state: Value,
	pub last_move_at: Option<i64>,
}

impl SessionNode {
	/// Decodes a raw node snapshot.
	pub fn decode(raw: &Value) -> Result<Self, RecordError> {
		let obj = raw.as_object().ok_or(RecordError::NotAnObject)?;

		let id = match obj.get(field::ID) {
			Some(Value::String(s)) => SessionId::parse(s)?,
			Some(_) => return Err(malformed(field::ID, "expected string")),
			None => return Err(RecordError::MissingField(field::ID)),
		};
		let created_at = int_field(obj, field::CREATED_AT)?.ok_or(RecordError::MissingField(field::CREATED_AT))?;
		let players = decode_players(obj.get(field::PLAYERS))?;
		let state = decode_state(obj.get(field::STATE))?;
		let last_move_at = int_field(obj, field::LAST_MOVE_AT)?;

		Ok(Self {
			id,
			created_at,
			players,
			state,
			last_move_at,
		})
	}

	/// Encodes the full node for a single put. Open seats and a missing
	/// `lastMoveAt` are left out so they cannot clobber concurrent writes.
	pub fn encode(&self) -> Result<Value, RecordError> {
		let mut players = Map::new();
		for seat in Seat::ALL {
			if let Some(info) = self.players.get(seat) {
				players.insert(seat.as_str().to_string(), encode_seat(info)?);
			}
		}

		let mut node = Map::new();
		node.insert(field::ID.to_string(), Value::String(self.id.to_string()));
		node.insert(field::CREATED_AT.to_string(), Value::from(self.created_at));
		node.insert(field::PLAYERS.to_string(), Value::Object(players));
		node.insert(field::STATE.to_string(), encode_state(&self.state)?);
		if let Some(at) = self.last_move_at {
			node.insert(field::LAST_MOVE_AT.to_string(), Value::from(at));
		}
		Ok(Value::Object(node))
	}
}

/// Encodes a seat record as the blob stored under `players/<seat>`.
pub fn encode_seat(info: &PlayerInfo) -> Result<Value, RecordError> {
	Ok(Value::String(serde_json::to_string(info)?))
}

/// Decodes a single seat value. `null` or absent means the seat is open.
pub fn decode_seat(raw: Option<&Value>) -> Result<Option<PlayerInfo>, RecordError> {
	match raw {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(blob)) => serde_json::from_str(blob)
			.map(Some)
			.map_err(|err| malformed(field::PLAYERS, err.to_string())),
		Some(value @ Value::Object(_)) => serde_json::from_value(value.clone())
			.map(Some)
			.map_err(|err| malformed(field::PLAYERS, err.to_string())),
		Some(_) => Err(malformed(field::PLAYERS, "seat must be a JSON string or object")),
	}
}

/// Encodes a game state as the blob stored under `state`.
pub fn encode_state<T: Serialize + ?Sized>(state: &T) -> Result<Value, RecordError> {
	Ok(Value::String(serde_json::to_string(state)?))
}

fn decode_players(raw: Option<&Value>) -> Result<Players, RecordError> {
	let obj = match raw {
		Some(Value::Object(obj)) => obj,
		Some(_) => return Err(malformed(field::PLAYERS, "expected object")),
		None => return Err(RecordError::MissingField(field::PLAYERS)),
	};
	Ok(Players {
		green: decode_seat(obj.get(Seat::Green.as_str()))?,
		gold: decode_seat(obj.get(Seat::Gold.as_str()))?,
	})
}

fn decode_state(raw: Option<&Value>) -> Result<Value, RecordError> {
	match raw {
		None | Some(Value::Null) => Err(RecordError::MissingField(field::STATE)),
		Some(Value::String(blob)) => serde_json::from_str(blob).map_err(|err| malformed(field::STATE, err.to_string())),
		Some(value @ Value::Object(_)) => Ok(value.clone()),
		Some(_) => Err(malformed(field::STATE, "expected JSON string or object")),
	}
}

fn int_field(obj: &Map<String, Value>, name: &'static str) -> Result<Option<i64>, RecordError> {
	match obj.get(name) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::Number(n)) => n
			.as_i64()
			.or_else(|| {
				n.as_f64()
					.filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
					.map(|f| f as i64)
			})
			.map(Some)
			.ok_or_else(|| malformed(name, format!("expected integer, got {n}"))),
		Some(_) => Err(malformed(name, "expected integer")),
	}
}

fn malformed(field: &'static str, reason: impl Into<String>) -> RecordError {
	RecordError::Malformed { field, reason: reason.into() }
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn ada() -> PlayerInfo {
		PlayerInfo {
			id: "anon-1".into(),
			pub_key: "anon-1".into(),
			name: "Ada".into(),
			joined_at: 10,
		}
	}

	fn node() -> SessionNode {
		SessionNode {
			id: SessionId::parse("S1").unwrap(),
			created_at: 10,
			players: Players::hosted_by(ada()),
			state: json!({"ply": 0, "turn": "green"}),
			last_move_at: None,
		}
	}

	#[test]
	fn encode_writes_blobs_and_skips_open_fields() {
		let raw = node().encode().unwrap();
		assert!(raw["state"].is_string());
		assert!(raw["players"]["green"].is_string());
		assert!(raw["players"].get("gold").is_none());
		assert!(raw.get("lastMoveAt").is_none());
		assert_eq!(SessionNode::decode(&raw).unwrap(), node());
	}

	#[test]
	fn decode_accepts_inline_objects() {
		let raw = json!({
			"id": "S1",
			"createdAt": 10.0,
			"players": { "green": serde_json::to_value(ada()).unwrap(), "gold": null },
			"state": { "ply": 0, "turn": "green" },
		});
		let decoded = SessionNode::decode(&raw).unwrap();
		assert_eq!(decoded, node());
	}

	#[test]
	fn decode_rejects_missing_state() {
		let raw = json!({ "id": "S1", "createdAt": 1, "players": {} });
		assert!(matches!(SessionNode::decode(&raw), Err(RecordError::MissingField("state"))));
	}

	#[test]
	fn decode_rejects_malformed_players() {
		let raw = json!({ "id": "S1", "createdAt": 1, "players": "nope", "state": "{}" });
		assert!(matches!(SessionNode::decode(&raw), Err(RecordError::Malformed { field: "players", .. })));

		let raw = json!({ "id": "S1", "createdAt": 1, "players": { "gold": "{not json" }, "state": "{}" });
		assert!(matches!(SessionNode::decode(&raw), Err(RecordError::Malformed { field: "players", .. })));
	}

	#[test]
	fn decode_rejects_fractional_timestamps() {
		let raw = json!({ "id": "S1", "createdAt": 1.5, "players": {}, "state": "{}" });
		assert!(matches!(SessionNode::decode(&raw), Err(RecordError::Malformed { field: "createdAt", .. })));

		let mut raw = node().encode().unwrap();
		raw["lastMoveAt"] = json!(20.25);
		assert!(matches!(SessionNode::decode(&raw), Err(RecordError::Malformed { field: "lastMoveAt", .. })));

		raw["lastMoveAt"] = json!(20.0);
		assert_eq!(SessionNode::decode(&raw).unwrap().last_move_at, Some(20));
	}

	#[test]
	fn decode_rejects_non_objects() {
		assert!(matches!(SessionNode::decode(&json!("x")), Err(RecordError::NotAnObject)));
		assert!(matches!(SessionNode::decode(&Value::Null), Err(RecordError::NotAnObject)));
	}
}
