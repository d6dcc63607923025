//! Participant records stored under a session's `players` node.

use serde::{Deserialize, Serialize};

use crate::seat::Seat;

/// A participant occupying a seat.
///
/// `pub_key` is the identity reference. Anonymous participants use the same
/// value for `id` and `pub_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
	pub id: String,
	#[serde(rename = "pub")]
	pub pub_key: String,
	pub name: String,
	pub joined_at: i64,
}

impl PlayerInfo {
	/// Returns true when this record belongs to the given identity.
	pub fn is_identity(&self, id: &str, pub_key: &str) -> bool {
		self.id == id || self.pub_key == pub_key
	}
}

/// Seat assignments of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub green: Option<PlayerInfo>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub gold: Option<PlayerInfo>,
}

impl Players {
	/// Players with only the host seat filled.
	pub fn hosted_by(host: PlayerInfo) -> Self {
		Self { green: Some(host), gold: None }
	}

	pub fn get(&self, seat: Seat) -> Option<&PlayerInfo> {
		match seat {
			Seat::Green => self.green.as_ref(),
			Seat::Gold => self.gold.as_ref(),
		}
	}

	pub fn set(&mut self, seat: Seat, info: PlayerInfo) {
		match seat {
			Seat::Green => self.green = Some(info),
			Seat::Gold => self.gold = Some(info),
		}
	}

	pub fn is_occupied(&self, seat: Seat) -> bool {
		self.get(seat).is_some()
	}

	/// Number of occupied seats (0..=2).
	pub fn occupied(&self) -> usize {
		Seat::ALL.iter().filter(|seat| self.is_occupied(**seat)).count()
	}

	pub fn is_full(&self) -> bool {
		self.occupied() == Seat::ALL.len()
	}

	/// Finds the seat held by an identity, green first.
	pub fn seat_of(&self, id: &str, pub_key: &str) -> Option<Seat> {
		Seat::ALL
			.into_iter()
			.find(|seat| self.get(*seat).is_some_and(|info| info.is_identity(id, pub_key)))
	}

	/// Overlays `newer` on top of `self`.
	///
	/// A seat open in `newer` keeps the value from `self`: once observed, a
	/// seat is never vacated by a later update.
	pub fn overlay(&self, newer: &Players) -> Players {
		Players {
			green: newer.green.clone().or_else(|| self.green.clone()),
			gold: newer.gold.clone().or_else(|| self.gold.clone()),
		}
	}
}
