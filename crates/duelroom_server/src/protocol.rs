//! Wire protocol: JSON text frames with a `type` discriminator.

use crate::error::ProtocolError;
use crate::room::{GameSnapshot, RoomId};
use duelroom_rules::{BOARD_SIZE, Cell, Evaluation, GameStatus, Symbol};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Messages sent by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new room and take the first seat.
    CreateRoom,
    /// Take the free seat in an existing room.
    JoinRoom {
        /// Room to join.
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    /// Place the connection's symbol at `index` (0-8).
    Move {
        /// Board index.
        index: usize,
    },
    /// Start a fresh game in the current room.
    ResetGame,
    /// Ask for the rooms waiting for an opponent.
    ListRooms,
    /// Join the first room waiting for an opponent, or open one.
    QuickMatch,
}

impl ClientMessage {
    /// Parses one inbound text frame.
    #[instrument(skip(text), fields(len = text.len()))]
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Entry in a `room_list` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Joinable room id.
    pub id: RoomId,
}

/// Messages sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Request was refused.
    Error {
        /// Human-readable reason.
        message: String,
    },
    /// Reply to `list_rooms`.
    RoomList {
        /// Rooms with exactly one participant.
        rooms: Vec<RoomSummary>,
    },
    /// Reply to `create_room`.
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        /// New room.
        room_id: RoomId,
        /// Symbol assigned to the creator.
        symbol: Symbol,
    },
    /// Reply to `join_room`.
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        /// Joined room.
        room_id: RoomId,
        /// Symbol assigned to the joiner.
        symbol: Symbol,
    },
    /// Sent to the waiting occupant when the second participant arrives.
    OpponentJoined,
    /// Sent to the remaining occupant when the other one leaves.
    OpponentDisconnected,
    /// Authoritative board after a join, move, or reset.
    #[serde(rename_all = "camelCase")]
    GameState {
        /// Cells in row-major order.
        board: [Cell; BOARD_SIZE],
        /// Symbol allowed to move next.
        current_player: Symbol,
        /// False once the game reached a win or draw.
        game_active: bool,
    },
    /// Terminal outcome of a game.
    #[serde(rename_all = "camelCase")]
    GameResult {
        /// `win` or `draw`.
        result: GameStatus,
        /// Present for wins only.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        winner: Option<Symbol>,
        /// Present for wins only.
        #[serde(skip_serializing_if = "Option::is_none", default)]
        win_line: Option<[usize; 3]>,
    },
}

impl ServerMessage {
    /// Builds an `error` message.
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Builds a `game_state` message from a room snapshot.
    pub fn game_state(snapshot: &GameSnapshot) -> Self {
        ServerMessage::GameState {
            board: *snapshot.board.cells(),
            current_player: snapshot.current_player,
            game_active: snapshot.active,
        }
    }

    /// Builds a `game_result` message from a terminal evaluation.
    pub fn game_result(evaluation: &Evaluation) -> Self {
        ServerMessage::GameResult {
            result: evaluation.status(),
            winner: evaluation.winner(),
            win_line: evaluation.win_line(),
        }
    }

    /// Serializes into one outbound text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
