//! Seams to the move-legality engine.
//!
//! The synchronization layer treats game state as opaque. It only needs the
//! move counter and whose turn it is.

use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;
use turnsync_protocol::Seat;

pub mod grid;

/// What the synchronizer reads from a game state.
pub trait TurnState: Clone + PartialEq + Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
	/// Number of moves applied so far. Strictly increases with every move.
	fn ply(&self) -> u64;

	/// Seat expected to move next.
	fn current_turn(&self) -> Seat;
}

/// A pure rules engine.
pub trait RulesEngine: Send + Sync + 'static {
	type State: TurnState;
	type Position: Clone + Debug + Send + Sync + 'static;

	/// Initial state of a new match.
	fn create_game(&self) -> Self::State;

	/// Applies a move, or `None` when it is illegal. A returned state must
	/// have a higher ply than `state`.
	fn apply_move(&self, state: &Self::State, from: &Self::Position, to: &Self::Position) -> Option<Self::State>;
}
