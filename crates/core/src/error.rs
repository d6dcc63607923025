//! Error taxonomy for session, seat and move operations.
//!
//! Every variant is recoverable and meant to be shown to a user. Malformed
//! data arriving from other peers never becomes an `Error`; the synchronizer
//! logs and drops it instead.

use turnsync_protocol::{RecordError, Seat, SessionId};
use turnsync_runtime::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
	#[error("session `{0}` not found")]
	SessionNotFound(SessionId),

	#[error("session `{0}` is full")]
	SessionFull(SessionId),

	#[error("seat `{seat}` in session `{session}` was claimed by another player")]
	SeatTaken { session: SessionId, seat: Seat },

	#[error("session is not ready for moves")]
	NotReady,

	#[error("local participant holds no seat in this session")]
	NotAPlayer,

	#[error("not your turn: `{turn}` is to move")]
	NotYourTurn { turn: Seat },

	#[error("illegal move")]
	IllegalMove,

	#[error("serialization error: {0}")]
	Serialization(String),

	#[error("timed out: {0}")]
	Timeout(String),

	#[error(transparent)]
	Store(#[from] StoreError),

	#[error("config error: {0}")]
	Config(String),
}

impl Error {
	pub fn is_timeout(&self) -> bool {
		matches!(self, Error::Timeout(_))
	}

	/// Seat and lookup failures that end a join attempt for good.
	pub fn is_join_rejection(&self) -> bool {
		matches!(self, Error::SessionNotFound(_) | Error::SessionFull(_) | Error::SeatTaken { .. })
	}
}

impl From<RecordError> for Error {
	fn from(err: RecordError) -> Self {
		Error::Serialization(err.to_string())
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Error::Serialization(err.to_string())
	}
}

pub type Result<T> = std::result::Result<T, Error>;
