//! A small reference engine used by the CLI and the tests.
//!
//! Eight by eight board. Green starts with a full row at the top, gold at the
//! bottom. A move steps one of your pieces to any adjacent square that is
//! empty or holds an enemy piece (capturing it). Taking the last enemy piece
//! wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use turnsync_protocol::Seat;

use super::{RulesEngine, TurnState};

pub const BOARD_SIZE: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
	pub row: u8,
	pub col: u8,
}

impl Position {
	pub const fn new(row: u8, col: u8) -> Self {
		Self { row, col }
	}

	fn in_bounds(self) -> bool {
		self.row < BOARD_SIZE && self.col < BOARD_SIZE
	}

	fn is_adjacent(self, other: Position) -> bool {
		self != other && self.row.abs_diff(other.row) <= 1 && self.col.abs_diff(other.col) <= 1
	}
}

impl fmt::Display for Position {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{},{}", self.row, self.col)
	}
}

/// Parses `row,col`, e.g. `0,1`.
impl FromStr for Position {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let (row, col) = s.split_once(',').ok_or_else(|| format!("expected `row,col`, got `{s}`"))?;
		let parse = |part: &str| part.trim().parse::<u8>().map_err(|err| format!("invalid coordinate `{part}`: {err}"));
		let position = Position::new(parse(row)?, parse(col)?);
		if !position.in_bounds() {
			return Err(format!("{position} is off the board"));
		}
		Ok(position)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridState {
	/// Row-major, `BOARD_SIZE` rows of `BOARD_SIZE` squares.
	pub board: Vec<Vec<Option<Seat>>>,
	pub current_player: Seat,
	pub ply: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub winner: Option<Seat>,
}

impl GridState {
	pub fn piece_at(&self, position: Position) -> Option<Seat> {
		self.board
			.get(position.row as usize)
			.and_then(|row| row.get(position.col as usize))
			.copied()
			.flatten()
	}

	pub fn pieces(&self, seat: Seat) -> usize {
		self.board.iter().flatten().filter(|square| **square == Some(seat)).count()
	}

	/// Every legal step for the side to move, in board order.
	pub fn legal_moves(&self) -> Vec<(Position, Position)> {
		if self.winner.is_some() {
			return Vec::new();
		}
		let mut moves = Vec::new();
		for row in 0..BOARD_SIZE {
			for col in 0..BOARD_SIZE {
				let from = Position::new(row, col);
				if self.piece_at(from) != Some(self.current_player) {
					continue;
				}
				for to_row in row.saturating_sub(1)..=(row + 1).min(BOARD_SIZE - 1) {
					for to_col in col.saturating_sub(1)..=(col + 1).min(BOARD_SIZE - 1) {
						let to = Position::new(to_row, to_col);
						if to != from && self.piece_at(to) != Some(self.current_player) {
							moves.push((from, to));
						}
					}
				}
			}
		}
		moves
	}

	/// `BOARD_SIZE` rows of `BOARD_SIZE` squares. Remote states are not
	/// guaranteed to be.
	pub fn is_well_formed(&self) -> bool {
		self.board.len() == BOARD_SIZE as usize && self.board.iter().all(|row| row.len() == BOARD_SIZE as usize)
	}

	fn set(&mut self, position: Position, piece: Option<Seat>) {
		if let Some(square) = self.board.get_mut(position.row as usize).and_then(|row| row.get_mut(position.col as usize)) {
			*square = piece;
		}
	}
}

impl TurnState for GridState {
	fn ply(&self) -> u64 {
		self.ply
	}

	fn current_turn(&self) -> Seat {
		self.current_player
	}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GridEngine;

impl RulesEngine for GridEngine {
	type State = GridState;
	type Position = Position;

	fn create_game(&self) -> GridState {
		let size = BOARD_SIZE as usize;
		let mut board = vec![vec![None; size]; size];
		board[0] = vec![Some(Seat::Green); size];
		board[size - 1] = vec![Some(Seat::Gold); size];
		GridState {
			board,
			current_player: Seat::Green,
			ply: 0,
			winner: None,
		}
	}

	fn apply_move(&self, state: &GridState, from: &Position, to: &Position) -> Option<GridState> {
		let (from, to) = (*from, *to);
		let mover = state.current_player;
		if state.winner.is_some() || !state.is_well_formed() || !from.in_bounds() || !to.in_bounds() || !from.is_adjacent(to) {
			return None;
		}
		if state.piece_at(from) != Some(mover) || state.piece_at(to) == Some(mover) {
			return None;
		}

		let mut next = state.clone();
		next.set(to, Some(mover));
		next.set(from, None);
		next.ply += 1;
		next.current_player = mover.opponent();
		if next.pieces(mover.opponent()) == 0 {
			next.winner = Some(mover);
		}
		Some(next)
	}
}
