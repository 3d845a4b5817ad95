//! Pluggable rule sets.
//!
//! A room only needs to know how to evaluate a board after each move, so the
//! game is swapped by handing the room a different [`RuleSet`].

use crate::rules::{self, Evaluation};
use crate::Board;
use std::sync::Arc;
use tracing::instrument;

/// Rules for a two-player game on a 9-cell board.
pub trait RuleSet: std::fmt::Debug + Send + Sync {
    /// Name used in logs and config.
    fn name(&self) -> &'static str;

    /// Evaluates the board after a move.
    fn evaluate(&self, board: &Board) -> Evaluation;
}

/// Classic tic-tac-toe: three in a row wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicTacToe;

impl RuleSet for TicTacToe {
    fn name(&self) -> &'static str {
        "tictactoe"
    }

    fn evaluate(&self, board: &Board) -> Evaluation {
        rules::evaluate(board)
    }
}

/// Rule sets selectable by name.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum GameKind {
    /// [`TicTacToe`].
    #[default]
    #[strum(to_string = "tictactoe", serialize = "tic-tac-toe")]
    TicTacToe,
}

impl GameKind {
    /// Instantiates the rule set.
    #[instrument]
    pub fn rules(self) -> Arc<dyn RuleSet> {
        match self {
            GameKind::TicTacToe => Arc::new(TicTacToe),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    #[test]
    fn test_game_kind_parses_case_insensitively() {
        assert_eq!("TicTacToe".parse::<GameKind>().unwrap(), GameKind::TicTacToe);
        assert_eq!("tic-tac-toe".parse::<GameKind>().unwrap(), GameKind::TicTacToe);
        assert!("chess".parse::<GameKind>().is_err());
        assert_eq!(GameKind::TicTacToe.to_string(), "tictactoe");
    }

    #[test]
    fn test_tictactoe_delegates_to_evaluate() {
        let rules = GameKind::TicTacToe.rules();
        let board: Board = [(0, Symbol::O), (4, Symbol::O), (8, Symbol::O)]
            .into_iter()
            .collect();
        assert_eq!(rules.name(), "tictactoe");
        assert_eq!(rules.evaluate(&board).winner(), Some(Symbol::O));
    }
}
