//! A single two-party game room.

use crate::error::{MoveRejection, RoomError};
use crate::protocol::ServerMessage;
use crate::transport::{ConnectionId, Outbox};
use derive_getters::Getters;
use duelroom_rules::{BOARD_SIZE, Board, Evaluation, RuleSet, Symbol};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Maximum participants per room.
pub const MAX_PARTICIPANTS: usize = 2;

/// Short opaque room code.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Borrows the code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::borrow::Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A connection seated in a room.
#[derive(Debug, Clone, Getters)]
pub struct Participant {
    connection: ConnectionId,
    symbol: Symbol,
    outbox: Outbox,
}

/// Lifecycle phase, derived from occupancy and `active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum RoomPhase {
    /// Fewer than two participants; moves are refused.
    WaitingForOpponent,
    /// Two participants, game live.
    InProgress,
    /// Two participants, game reached a win or draw.
    Finished,
}

/// Board state as broadcast in `game_state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSnapshot {
    /// Current board.
    pub board: Board,
    /// Symbol allowed to move next.
    pub current_player: Symbol,
    /// False once a terminal state was reached.
    pub active: bool,
}

/// Result of an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Game continues; the turn passed to the other symbol.
    Continue,
    /// Move ended the game.
    Finished(Evaluation),
}

/// Result of a participant leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Nobody is left; the room is closed and must be removed from the registry.
    Emptied,
    /// One participant remains.
    Remaining,
    /// Connection was not seated here.
    NotPresent,
}

/// One game's board, turn and up to two participants.
#[derive(Debug)]
pub struct Room {
    id: RoomId,
    sequence: u64,
    rules: Arc<dyn RuleSet>,
    board: Board,
    current_player: Symbol,
    active: bool,
    participants: Vec<Participant>,
    closed: bool,
}

impl Room {
    /// Creates an empty room with a fresh board.
    #[instrument(skip(rules), fields(rules = rules.name()))]
    pub fn new(id: RoomId, sequence: u64, rules: Arc<dyn RuleSet>) -> Self {
        info!(room_id = %id, "Creating room");
        Self {
            id,
            sequence,
            rules,
            board: Board::new(),
            current_player: Symbol::X,
            active: true,
            participants: Vec::with_capacity(MAX_PARTICIPANTS),
            closed: false,
        }
    }

    /// Room code.
    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Creation order within the registry.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Seated participants, in arrival order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Symbol held by a connection, if seated here.
    pub fn symbol_of(&self, connection: ConnectionId) -> Option<Symbol> {
        self.participants
            .iter()
            .find(|p| p.connection == connection)
            .map(|p| p.symbol)
    }

    /// True after the last participant left.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Exactly one participant and still open.
    pub fn is_joinable(&self) -> bool {
        !self.closed && self.participants.len() == 1
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RoomPhase {
        if self.participants.len() < MAX_PARTICIPANTS {
            RoomPhase::WaitingForOpponent
        } else if self.active {
            RoomPhase::InProgress
        } else {
            RoomPhase::Finished
        }
    }

    /// Copies the board state.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            board: self.board.clone(),
            current_player: self.current_player,
            active: self.active,
        }
    }

    /// Seats a connection.
    ///
    /// The joiner takes whichever symbol the current occupant does not hold.
    /// Seating the second participant starts a fresh game.
    #[instrument(skip(self, outbox), fields(room_id = %self.id))]
    pub fn join(&mut self, connection: ConnectionId, outbox: Outbox) -> Result<Symbol, RoomError> {
        if self.closed {
            debug!("Join attempted on closed room");
            return Err(RoomError::RoomNotFound(self.id.clone()));
        }
        if self.participants.len() >= MAX_PARTICIPANTS {
            warn!(%connection, "Room already has 2 participants");
            return Err(RoomError::RoomFull(self.id.clone()));
        }

        let symbol = match self.participants.first() {
            None => Symbol::X,
            Some(occupant) => occupant.symbol.opponent(),
        };
        self.participants.push(Participant {
            connection,
            symbol,
            outbox,
        });
        info!(%connection, %symbol, participants = self.participants.len(), "Participant joined");

        if self.participants.len() == MAX_PARTICIPANTS {
            self.restart();
        }
        Ok(symbol)
    }

    /// Applies a move for `symbol` at `index`.
    ///
    /// Refused moves leave the room untouched.
    #[instrument(skip(self), fields(room_id = %self.id))]
    pub fn apply_move(&mut self, symbol: Symbol, index: usize) -> Result<MoveOutcome, RoomError> {
        if self.phase() != RoomPhase::InProgress {
            return Err(RoomError::IllegalMove(MoveRejection::NotInProgress));
        }
        if index >= BOARD_SIZE {
            return Err(RoomError::IllegalMove(MoveRejection::OutOfBounds(index)));
        }
        if !self.board.is_empty(index) {
            return Err(RoomError::IllegalMove(MoveRejection::Occupied(index)));
        }
        if symbol != self.current_player {
            return Err(RoomError::IllegalMove(MoveRejection::NotYourTurn(symbol)));
        }

        self.board
            .place(index, symbol)
            .map_err(|_| RoomError::IllegalMove(MoveRejection::Occupied(index)))?;

        let evaluation = self.rules.evaluate(&self.board);
        if evaluation.is_terminal() {
            self.active = false;
            info!(
                status = %evaluation.status(),
                winner = ?evaluation.winner(),
                board = %self.board.display(),
                "Game finished"
            );
            Ok(MoveOutcome::Finished(evaluation))
        } else {
            self.current_player = symbol.opponent();
            debug!(next = %self.current_player, "Move accepted");
            Ok(MoveOutcome::Continue)
        }
    }

    /// Clears the board for a new game. Requires two participants.
    #[instrument(skip(self), fields(room_id = %self.id))]
    pub fn reset(&mut self) -> Result<(), RoomError> {
        if self.participants.len() < MAX_PARTICIPANTS {
            debug!("Reset refused while waiting for opponent");
            return Err(RoomError::AwaitingOpponent);
        }
        self.restart();
        info!("Game reset");
        Ok(())
    }

    /// Removes a connection. The last departure closes the room.
    #[instrument(skip(self), fields(room_id = %self.id))]
    pub fn leave(&mut self, connection: ConnectionId) -> Departure {
        let Some(position) = self
            .participants
            .iter()
            .position(|p| p.connection == connection)
        else {
            return Departure::NotPresent;
        };
        self.participants.remove(position);

        if self.participants.is_empty() {
            self.closed = true;
            info!("Last participant left; room closed");
            Departure::Emptied
        } else {
            info!(remaining = self.participants.len(), "Participant left");
            Departure::Remaining
        }
    }

    /// Sends a message to every participant.
    pub fn broadcast(&self, message: &ServerMessage) {
        for participant in &self.participants {
            participant.outbox.send(message.clone());
        }
    }

    /// Sends a message to every participant except `connection`.
    pub fn send_to_others(&self, connection: ConnectionId, message: &ServerMessage) {
        self.participants
            .iter()
            .filter(|p| p.connection != connection)
            .for_each(|p| p.outbox.send(message.clone()));
    }

    fn restart(&mut self) {
        self.board = Board::new();
        self.current_player = Symbol::X;
        self.active = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duelroom_rules::{GameStatus, TicTacToe};

    fn room() -> Room {
        Room::new(RoomId::from("TEST01"), 0, Arc::new(TicTacToe))
    }

    fn seat(room: &mut Room) -> (ConnectionId, Symbol) {
        let (outbox, _rx) = Outbox::channel();
        let connection = outbox.connection();
        let symbol = room.join(connection, outbox).unwrap();
        (connection, symbol)
    }

    fn full_room() -> Room {
        let mut room = room();
        seat(&mut room);
        seat(&mut room);
        room
    }

    #[test]
    fn test_symbols_follow_arrival_order() {
        let mut room = room();
        assert_eq!(room.phase(), RoomPhase::WaitingForOpponent);
        assert_eq!(seat(&mut room).1, Symbol::X);
        assert!(room.is_joinable());
        assert_eq!(seat(&mut room).1, Symbol::O);
        assert_eq!(room.phase(), RoomPhase::InProgress);
        assert!(!room.is_joinable());
    }

    #[test]
    fn test_third_join_is_full() {
        let mut room = full_room();
        let before: Vec<_> = room.participants().iter().map(|p| *p.connection()).collect();
        let (outbox, _rx) = Outbox::channel();
        let result = room.join(outbox.connection(), outbox);
        assert_eq!(result, Err(RoomError::RoomFull(RoomId::from("TEST01"))));
        let after: Vec<_> = room.participants().iter().map(|p| *p.connection()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_move_needs_opponent() {
        let mut room = room();
        seat(&mut room);
        assert_eq!(
            room.apply_move(Symbol::X, 4),
            Err(RoomError::IllegalMove(MoveRejection::NotInProgress))
        );
        assert_eq!(room.snapshot().board.occupied_count(), 0);
    }

    #[test]
    fn test_turns_alternate() {
        let mut room = full_room();
        assert_eq!(room.apply_move(Symbol::X, 4), Ok(MoveOutcome::Continue));
        assert_eq!(room.snapshot().current_player, Symbol::O);
        assert_eq!(room.apply_move(Symbol::O, 0), Ok(MoveOutcome::Continue));
        assert_eq!(room.snapshot().current_player, Symbol::X);
    }

    #[test]
    fn test_out_of_turn_move_changes_nothing() {
        let mut room = full_room();
        let before = room.snapshot();
        assert_eq!(
            room.apply_move(Symbol::O, 4),
            Err(RoomError::IllegalMove(MoveRejection::NotYourTurn(Symbol::O)))
        );
        assert_eq!(room.snapshot(), before);
    }

    #[test]
    fn test_occupied_and_out_of_range_rejected() {
        let mut room = full_room();
        room.apply_move(Symbol::X, 4).unwrap();
        assert_eq!(
            room.apply_move(Symbol::O, 4),
            Err(RoomError::IllegalMove(MoveRejection::Occupied(4)))
        );
        assert_eq!(
            room.apply_move(Symbol::O, 9),
            Err(RoomError::IllegalMove(MoveRejection::OutOfBounds(9)))
        );
        assert_eq!(room.snapshot().current_player, Symbol::O);
    }

    #[test]
    fn test_win_finishes_game_and_blocks_moves() {
        let mut room = full_room();
        for (symbol, index) in [(Symbol::X, 4), (Symbol::O, 0), (Symbol::X, 1), (Symbol::O, 3)] {
            room.apply_move(symbol, index).unwrap();
        }
        let outcome = room.apply_move(Symbol::X, 7).unwrap();
        let MoveOutcome::Finished(evaluation) = outcome else {
            panic!("expected a finished game, got {:?}", outcome);
        };
        assert_eq!(evaluation.status(), GameStatus::Win);
        assert_eq!(evaluation.win_line(), Some([1, 4, 7]));
        assert_eq!(room.phase(), RoomPhase::Finished);
        assert!(!room.snapshot().active);
        assert_eq!(
            room.apply_move(Symbol::O, 8),
            Err(RoomError::IllegalMove(MoveRejection::NotInProgress))
        );
    }

    #[test]
    fn test_reset_restores_fresh_game() {
        let mut room = full_room();
        room.apply_move(Symbol::X, 0).unwrap();
        room.reset().unwrap();
        let snapshot = room.snapshot();
        assert_eq!(snapshot.board, Board::new());
        assert_eq!(snapshot.current_player, Symbol::X);
        assert!(snapshot.active);
    }

    #[test]
    fn test_reset_while_waiting_is_refused() {
        let mut room = room();
        seat(&mut room);
        assert_eq!(room.reset(), Err(RoomError::AwaitingOpponent));
    }

    #[test]
    fn test_leave_and_rejoin_takes_free_symbol() {
        let mut room = room();
        let (x, _) = seat(&mut room);
        seat(&mut room);
        room.apply_move(Symbol::X, 4).unwrap();

        assert_eq!(room.leave(x), Departure::Remaining);
        assert_eq!(room.phase(), RoomPhase::WaitingForOpponent);
        assert!(room.is_joinable());

        let (_, symbol) = seat(&mut room);
        assert_eq!(symbol, Symbol::X);
        assert_eq!(room.snapshot().board, Board::new());
    }

    #[test]
    fn test_last_departure_closes_room() {
        let mut room = room();
        let (x, _) = seat(&mut room);
        assert_eq!(room.leave(ConnectionId::next()), Departure::NotPresent);
        assert_eq!(room.leave(x), Departure::Emptied);
        assert!(room.is_closed());
        assert!(!room.is_joinable());
        let (outbox, _rx) = Outbox::channel();
        assert_eq!(
            room.join(outbox.connection(), outbox),
            Err(RoomError::RoomNotFound(RoomId::from("TEST01")))
        );
    }
}
