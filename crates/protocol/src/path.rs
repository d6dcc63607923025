//! Store path layout for sessions.
//!
//! Paths are `/`-separated. A session lives at `<namespace>/<id>` and its
//! fields are direct children of that node.

use crate::seat::Seat;
use crate::session_id::SessionId;

/// Namespace used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "turnsync/games";

/// Field names of a session node.
pub mod field {
	pub const ID: &str = "id";
	pub const CREATED_AT: &str = "createdAt";
	pub const PLAYERS: &str = "players";
	pub const STATE: &str = "state";
	pub const LAST_MOVE_AT: &str = "lastMoveAt";
}

/// Joins a child key onto a base path.
pub fn join(base: &str, key: &str) -> String {
	let base = base.trim_end_matches('/');
	let key = key.trim_start_matches('/');
	match (base.is_empty(), key.is_empty()) {
		(true, _) => key.to_string(),
		(_, true) => base.to_string(),
		_ => format!("{base}/{key}"),
	}
}

/// Path of a session node.
pub fn session_path(namespace: &str, id: &SessionId) -> String {
	join(namespace, id.as_str())
}

/// Path of one seat inside a session node.
pub fn seat_path(namespace: &str, id: &SessionId, seat: Seat) -> String {
	join(&join(&session_path(namespace, id), field::PLAYERS), seat.as_str())
}
