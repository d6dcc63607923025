//! The two named participant slots of a match.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the two seats in a session.
///
/// Green is always the host seat; gold is claimed by the joiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
	Green,
	Gold,
}

impl Seat {
	/// Both seats in store order.
	pub const ALL: [Seat; 2] = [Seat::Green, Seat::Gold];

	/// The seat across the board.
	pub fn opponent(self) -> Seat {
		match self {
			Seat::Green => Seat::Gold,
			Seat::Gold => Seat::Green,
		}
	}

	/// Field name used for this seat under `players/`.
	pub fn as_str(self) -> &'static str {
		match self {
			Seat::Green => "green",
			Seat::Gold => "gold",
		}
	}
}

impl fmt::Display for Seat {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Seat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"green" => Ok(Seat::Green),
			"gold" => Ok(Seat::Gold),
			other => Err(format!("unknown seat `{other}`")),
		}
	}
}
