//! Duelroom rules - pure board evaluation for two-player games
//!
//! Everything in this crate is synchronous and free of shared state:
//!
//! - **Types**: [`Board`], [`Cell`], [`Symbol`]
//! - **Rules**: [`evaluate`] over the fixed [`WIN_LINES`]
//! - **Rule sets**: the [`RuleSet`] trait a room is parameterized by
//!
//! # Example
//!
//! ```
//! use duelroom_rules::{evaluate, Board, GameStatus, Symbol};
//!
//! let board: Board = [(1, Symbol::X), (4, Symbol::X), (7, Symbol::X)]
//!     .into_iter()
//!     .collect();
//! let evaluation = evaluate(&board);
//! assert_eq!(evaluation.status(), GameStatus::Win);
//! assert_eq!(evaluation.win_line(), Some([1, 4, 7]));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod rules;
mod ruleset;
mod types;

pub use rules::{Evaluation, GameStatus, WIN_LINES, evaluate, find_winning_line, is_full};
pub use ruleset::{GameKind, RuleSet, TicTacToe};
pub use types::{BOARD_SIZE, Board, BoardError, Cell, Symbol};
