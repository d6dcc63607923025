//! Who the local participant is.

use rand::Rng;
use rand::distributions::Alphanumeric;
use turnsync_protocol::{PlayerInfo, Players, Seat};

use crate::clock::now_ms;

/// The local participant.
///
/// Authenticated participants are identified by their public key. Anonymous
/// ones get an `anon-<ms>-<random>` id that stays fixed for the lifetime of
/// the value, so reusing an `Identity` lets a participant rejoin its seat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	id: String,
	pub_key: String,
	authenticated: bool,
}

impl Identity {
	pub fn authenticated(pub_key: impl Into<String>) -> Self {
		let pub_key = pub_key.into();
		Self {
			id: pub_key.clone(),
			pub_key,
			authenticated: true,
		}
	}

	pub fn anonymous() -> Self {
		let suffix: String = rand::thread_rng()
			.sample_iter(&Alphanumeric)
			.take(9)
			.map(|byte| char::from(byte).to_ascii_lowercase())
			.collect();
		let id = format!("anon-{}-{suffix}", now_ms());
		Self {
			pub_key: id.clone(),
			id,
			authenticated: false,
		}
	}

	/// Authenticated when a key is available, anonymous otherwise.
	pub fn from_key(pub_key: Option<&str>) -> Self {
		match pub_key.filter(|key| !key.is_empty()) {
			Some(key) => Self::authenticated(key),
			None => Self::anonymous(),
		}
	}

	pub fn id(&self) -> &str {
		&self.id
	}

	pub fn pub_key(&self) -> &str {
		&self.pub_key
	}

	pub fn is_anonymous(&self) -> bool {
		!self.authenticated
	}

	/// Seat record for this participant.
	pub fn player_info(&self, name: &str, joined_at: i64) -> PlayerInfo {
		PlayerInfo {
			id: self.id.clone(),
			pub_key: self.pub_key.clone(),
			name: name.to_string(),
			joined_at,
		}
	}

	/// Seat this participant holds in `players`, if any.
	pub fn seat_in(&self, players: &Players) -> Option<Seat> {
		players.seat_of(&self.id, &self.pub_key)
	}
}
