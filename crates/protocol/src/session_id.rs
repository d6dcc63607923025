//! Session identifiers.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::node::RecordError;

/// Length of the random suffix appended to generated identifiers.
const SUFFIX_LEN: usize = 10;

/// Globally unique match identifier: `<prefix>-<epoch ms>-<random suffix>`.
///
/// Identifiers double as path segments, so they may not be empty or contain `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
	/// Generates a fresh identifier. The random suffix makes it unguessable, so
	/// creation never races with another host.
	pub fn generate(prefix: &str, now_ms: i64) -> Self {
		let suffix: String = rand::thread_rng()
			.sample_iter(&Alphanumeric)
			.take(SUFFIX_LEN)
			.map(|b| char::from(b).to_ascii_lowercase())
			.collect();
		Self(format!("{prefix}-{now_ms}-{suffix}"))
	}

	/// Validates an identifier received from a user or the store.
	pub fn parse(raw: &str) -> Result<Self, RecordError> {
		let trimmed = raw.trim();
		if trimmed.is_empty() || trimmed.contains('/') {
			return Err(RecordError::InvalidSessionId(raw.to_string()));
		}
		Ok(Self(trimmed.to_string()))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for SessionId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl FromStr for SessionId {
	type Err = RecordError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl TryFrom<String> for SessionId {
	type Error = RecordError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}

impl From<SessionId> for String {
	fn from(id: SessionId) -> Self {
		id.0
	}
}
