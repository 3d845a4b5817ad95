//! Error types for room coordination.

use crate::room::RoomId;
use derive_more::{Display, Error};
use duelroom_rules::Symbol;
use tracing::instrument;

/// Why a move was refused. Refused moves never change room state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum MoveRejection {
    /// Room has fewer than two participants or the game is over.
    #[display("Game is not in progress")]
    NotInProgress,
    /// Index is not in `0..9`.
    #[display("Position {} is out of bounds", _0)]
    OutOfBounds(#[error(not(source))] usize),
    /// Cell already holds a symbol.
    #[display("Position {} is already occupied", _0)]
    Occupied(#[error(not(source))] usize),
    /// Mover is not the current player.
    #[display("It's not {}'s turn", _0)]
    NotYourTurn(#[error(not(source))] Symbol),
}

/// Errors raised by room and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum RoomError {
    /// No room with this id exists (or it is being torn down).
    #[display("Room not found")]
    RoomNotFound(#[error(not(source))] RoomId),
    /// Room already holds two participants.
    #[display("Room is full")]
    RoomFull(#[error(not(source))] RoomId),
    /// Move refused; dropped without telling the client.
    #[display("Illegal move: {}", _0)]
    IllegalMove(MoveRejection),
    /// Reset requested while only one participant is present.
    #[display("Cannot reset while waiting for an opponent")]
    AwaitingOpponent,
}

impl RoomError {
    /// Whether the requesting client should receive an `error` message.
    ///
    /// Only lookup and capacity failures are surfaced; refused moves and
    /// resets are dropped.
    pub fn is_reported(&self) -> bool {
        matches!(self, RoomError::RoomNotFound(_) | RoomError::RoomFull(_))
    }
}

/// Inbound frame could not be understood.
#[derive(Debug, Display, Error)]
#[display("Malformed message: {}", source)]
pub struct ProtocolError {
    source: serde_json::Error,
}

impl From<serde_json::Error> for ProtocolError {
    fn from(source: serde_json::Error) -> Self {
        Self { source }
    }
}

/// Delivery to a connection failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum TransportError {
    /// Peer is gone; the receiving half has been dropped.
    #[display("Connection closed")]
    Closed,
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
