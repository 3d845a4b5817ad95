//! Pure functions evaluating a board.
//!
//! Nothing here holds state or performs I/O, so every function can be
//! called standalone.

mod draw;
mod win;

pub use draw::is_full;
pub use win::{WIN_LINES, find_winning_line};

use crate::{Board, Symbol};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Coarse status of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameStatus {
    /// Moves can still be made.
    Active,
    /// One symbol completed a line.
    Win,
    /// Board is full with no completed line.
    Draw,
}

/// Result of evaluating a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Evaluation {
    /// No line completed and at least one empty cell.
    Active,
    /// `winner` holds every cell of `line`.
    Win {
        /// Symbol that completed the line.
        winner: Symbol,
        /// Indices of the completed line.
        line: [usize; 3],
    },
    /// Full board, no completed line.
    Draw,
}

impl Evaluation {
    /// Returns the coarse status.
    pub fn status(&self) -> GameStatus {
        match self {
            Evaluation::Active => GameStatus::Active,
            Evaluation::Win { .. } => GameStatus::Win,
            Evaluation::Draw => GameStatus::Draw,
        }
    }

    /// Returns the winner if there is one.
    pub fn winner(&self) -> Option<Symbol> {
        match self {
            Evaluation::Win { winner, .. } => Some(*winner),
            _ => None,
        }
    }

    /// Returns the winning line if there is one.
    pub fn win_line(&self) -> Option<[usize; 3]> {
        match self {
            Evaluation::Win { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// True for wins and draws.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Evaluation::Active)
    }
}

/// Evaluates a board: first winning line in enumeration order, else draw
/// when full, else active.
#[instrument(skip(board))]
pub fn evaluate(board: &Board) -> Evaluation {
    let evaluation = if let Some((winner, line)) = find_winning_line(board) {
        Evaluation::Win { winner, line }
    } else if is_full(board) {
        Evaluation::Draw
    } else {
        Evaluation::Active
    };
    debug!(status = %evaluation.status(), "Evaluated board");
    evaluation
}
