//! Duelroom server - room and session coordination over WebSockets
//!
//! Pairs two connections into a room, relays validated moves and keeps both
//! participants in sync on every state change.
//!
//! # Architecture
//!
//! - **Registry**: process-wide map of rooms, one lock per room
//! - **Room**: seats, board and turn state for a single match
//! - **Session**: per-connection dispatch of client messages
//! - **Server**: axum WebSocket endpoint plus `/health`
//!
//! # Example
//!
//! ```
//! use duelroom_server::{ClientMessage, Outbox, RoomRegistry, SessionHandler};
//!
//! let registry = RoomRegistry::default();
//! let (outbox, mut rx) = Outbox::channel();
//! let mut session = SessionHandler::new(outbox, registry.clone());
//!
//! session.handle(ClientMessage::CreateRoom);
//! assert!(session.binding().is_some());
//! assert!(rx.try_recv().is_ok());
//! assert_eq!(registry.list_joinable().len(), 1);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod cli;
mod config;
mod error;
mod protocol;
mod registry;
mod room;
mod server;
mod session;
mod transport;

// Crate-level exports - Command line
pub use cli::{Cli, Command};

// Crate-level exports - Configuration
pub use config::{HOST_ENV, PORT_ENV, ServerConfig};

// Crate-level exports - Errors
pub use error::{ConfigError, MoveRejection, ProtocolError, RoomError, TransportError};

// Crate-level exports - Wire protocol
pub use protocol::{ClientMessage, RoomSummary, ServerMessage};

// Crate-level exports - Rooms
pub use registry::{DEFAULT_ROOM_CODE_LENGTH, RoomRegistry, generate_room_code};
pub use room::{
    Departure, GameSnapshot, MAX_PARTICIPANTS, MoveOutcome, Participant, Room, RoomId, RoomPhase,
};

// Crate-level exports - Server
pub use server::{AppState, HealthReport, RoomServer, serve, shutdown_signal};

// Crate-level exports - Sessions and transport
pub use session::{ALREADY_IN_ROOM, Binding, SessionHandler};
pub use transport::{ConnectionId, Outbox};
