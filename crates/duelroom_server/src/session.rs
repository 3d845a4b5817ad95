//! Per-connection protocol dispatch.
//!
//! A [`SessionHandler`] validates each inbound message against the
//! connection's current room binding and delegates to the registry. Every
//! fan-out that follows a room mutation is sent while that room's lock is
//! held, so both participants observe the same committed transition with
//! nothing interleaved between the two sends.

use crate::error::RoomError;
use crate::protocol::{ClientMessage, RoomSummary, ServerMessage};
use crate::registry::RoomRegistry;
use crate::room::{Departure, MoveOutcome, Room, RoomId};
use crate::transport::{ConnectionId, Outbox};
use derive_getters::Getters;
use derive_new::new;
use duelroom_rules::Symbol;
use tracing::{debug, info, instrument, warn};

/// Reply sent when a bound connection tries to create or join a room.
pub const ALREADY_IN_ROOM: &str = "Already in a room";

/// The room and symbol a connection is seated with.
#[derive(Debug, Clone, PartialEq, Eq, Getters, new)]
pub struct Binding {
    room_id: RoomId,
    symbol: Symbol,
}

/// Dispatcher for one connection.
#[derive(Debug)]
pub struct SessionHandler {
    connection: ConnectionId,
    outbox: Outbox,
    registry: RoomRegistry,
    binding: Option<Binding>,
}

impl SessionHandler {
    /// Creates an unbound session.
    pub fn new(outbox: Outbox, registry: RoomRegistry) -> Self {
        Self {
            connection: outbox.connection(),
            outbox,
            registry,
            binding: None,
        }
    }

    /// Connection served by this handler.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Current room binding, if any.
    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    /// Decodes and handles one text frame. Malformed frames are dropped.
    #[instrument(skip(self, text), fields(connection = %self.connection))]
    pub fn handle_text(&mut self, text: &str) {
        match ClientMessage::decode(text) {
            Ok(message) => self.handle(message),
            Err(e) => warn!(error = %e, "Dropping malformed message"),
        }
    }

    /// Handles one decoded message.
    #[instrument(skip(self), fields(connection = %self.connection))]
    pub fn handle(&mut self, message: ClientMessage) {
        match message {
            ClientMessage::CreateRoom => self.create_room(),
            ClientMessage::JoinRoom { room_id } => self.join_room(room_id),
            ClientMessage::Move { index } => self.make_move(index),
            ClientMessage::ResetGame => self.reset_game(),
            ClientMessage::ListRooms => self.list_rooms(),
            ClientMessage::QuickMatch => self.quick_match(),
        }
    }

    /// Leaves the current room, if any, when the transport closes.
    #[instrument(skip(self), fields(connection = %self.connection))]
    pub fn disconnect(mut self) {
        let Some(binding) = self.binding.take() else {
            debug!("Unbound connection closed");
            return;
        };
        let connection = self.connection;
        let departure = self.registry.with_room(binding.room_id.as_str(), |room| {
            let departure = room.leave(connection);
            if departure == Departure::Remaining {
                room.broadcast(&ServerMessage::OpponentDisconnected);
            }
            departure
        });

        match departure {
            Ok(Departure::Emptied) => {
                self.registry.remove(binding.room_id.as_str());
            }
            Ok(Departure::Remaining) => {
                info!(room_id = %binding.room_id, "Notified remaining participant");
            }
            Ok(Departure::NotPresent) | Err(_) => {
                debug!(room_id = %binding.room_id, "Room already gone on disconnect");
            }
        }
    }

    fn ensure_unbound(&self) -> bool {
        if let Some(binding) = &self.binding {
            debug!(room_id = %binding.room_id, "Connection already bound");
            self.outbox.send(ServerMessage::error(ALREADY_IN_ROOM));
            return false;
        }
        true
    }

    fn create_room(&mut self) {
        if !self.ensure_unbound() {
            return;
        }
        self.open_room();
    }

    fn open_room(&mut self) {
        let connection = self.connection;
        let outbox = self.outbox.clone();
        let (room_id, joined) = self.registry.create_room_with(|room| {
            let symbol = room.join(connection, outbox.clone())?;
            outbox.send(ServerMessage::RoomCreated {
                room_id: room.id().clone(),
                symbol,
            });
            Ok::<_, RoomError>(symbol)
        });

        match joined {
            Ok(symbol) => {
                info!(%room_id, %symbol, "Room created");
                self.binding = Some(Binding::new(room_id, symbol));
            }
            Err(e) => {
                warn!(%room_id, error = %e, "Could not seat creator in new room");
                self.registry.remove(room_id.as_str());
            }
        }
    }

    fn join_room(&mut self, room_id: RoomId) {
        if !self.ensure_unbound() {
            return;
        }
        if let Err(e) = self.try_join(&room_id) {
            debug!(%room_id, error = %e, "Join refused");
            if e.is_reported() {
                self.outbox.send(ServerMessage::error(e.to_string()));
            }
        }
    }

    fn try_join(&mut self, room_id: &RoomId) -> Result<(), RoomError> {
        let connection = self.connection;
        let outbox = self.outbox.clone();
        let symbol = self
            .registry
            .with_room(room_id.as_str(), |room| seat_joiner(room, connection, outbox))??;
        info!(%room_id, %symbol, "Joined room");
        self.binding = Some(Binding::new(room_id.clone(), symbol));
        Ok(())
    }

    fn quick_match(&mut self) {
        if !self.ensure_unbound() {
            return;
        }
        for room_id in self.registry.list_joinable() {
            match self.try_join(&room_id) {
                Ok(()) => return,
                Err(e) => debug!(%room_id, error = %e, "Quick match candidate taken"),
            }
        }
        self.open_room();
    }

    fn make_move(&self, index: usize) {
        let Some(binding) = &self.binding else {
            debug!(index, "Move from unbound connection ignored");
            return;
        };
        let symbol = binding.symbol;
        let result = self.registry.with_room(binding.room_id.as_str(), |room| {
            let outcome = room.apply_move(symbol, index)?;
            room.broadcast(&ServerMessage::game_state(&room.snapshot()));
            if let MoveOutcome::Finished(evaluation) = outcome {
                room.broadcast(&ServerMessage::game_result(&evaluation));
            }
            Ok::<_, RoomError>(outcome)
        });

        match result.and_then(|inner| inner) {
            Ok(outcome) => debug!(index, %symbol, ?outcome, "Move applied"),
            Err(e) => debug!(index, %symbol, error = %e, "Move ignored"),
        }
    }

    fn reset_game(&self) {
        let Some(binding) = &self.binding else {
            debug!("Reset from unbound connection ignored");
            return;
        };
        let result = self.registry.with_room(binding.room_id.as_str(), |room| {
            room.reset()?;
            room.broadcast(&ServerMessage::game_state(&room.snapshot()));
            Ok::<_, RoomError>(())
        });

        if let Err(e) = result.and_then(|inner| inner) {
            debug!(error = %e, "Reset ignored");
        }
    }

    fn list_rooms(&self) {
        let rooms = self
            .registry
            .list_joinable()
            .into_iter()
            .map(|id| RoomSummary { id })
            .collect();
        self.outbox.send(ServerMessage::RoomList { rooms });
    }
}

/// Seats a joiner and performs the join fan-out under the room lock:
/// acknowledgment to the joiner, `opponent_joined` to the occupant, then the
/// initial state to both.
fn seat_joiner(
    room: &mut Room,
    connection: ConnectionId,
    outbox: Outbox,
) -> Result<Symbol, RoomError> {
    let symbol = room.join(connection, outbox.clone())?;
    outbox.send(ServerMessage::RoomJoined {
        room_id: room.id().clone(),
        symbol,
    });
    if room.participants().len() == crate::room::MAX_PARTICIPANTS {
        room.send_to_others(connection, &ServerMessage::OpponentJoined);
        room.broadcast(&ServerMessage::game_state(&room.snapshot()));
    }
    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn drain(rx: &mut UnboundedReceiver<ServerMessage>) -> Vec<ServerMessage> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[test]
    fn test_create_room_binds_as_x() {
        let registry = RoomRegistry::default();
        let (outbox, mut rx) = Outbox::channel();
        let mut session = SessionHandler::new(outbox, registry.clone());

        session.handle(ClientMessage::CreateRoom);

        let binding = session.binding().cloned().unwrap();
        assert_eq!(*binding.symbol(), Symbol::X);
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::RoomCreated {
                room_id: binding.room_id().clone(),
                symbol: Symbol::X
            }]
        );
        assert_eq!(registry.list_joinable(), vec![binding.room_id().clone()]);
    }

    #[test]
    fn test_second_create_is_refused() {
        let registry = RoomRegistry::default();
        let (outbox, mut rx) = Outbox::channel();
        let mut session = SessionHandler::new(outbox, registry.clone());
        session.handle(ClientMessage::CreateRoom);
        drain(&mut rx);

        session.handle(ClientMessage::CreateRoom);
        assert_eq!(drain(&mut rx), vec![ServerMessage::error(ALREADY_IN_ROOM)]);
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn test_join_unknown_room_reports_error() {
        let registry = RoomRegistry::default();
        let (outbox, mut rx) = Outbox::channel();
        let mut session = SessionHandler::new(outbox, registry);

        session.handle(ClientMessage::JoinRoom {
            room_id: RoomId::from("ZZZZZZ"),
        });

        assert_eq!(drain(&mut rx), vec![ServerMessage::error("Room not found")]);
        assert!(session.binding().is_none());
    }

    #[test]
    fn test_move_and_reset_while_unbound_are_silent() {
        let (outbox, mut rx) = Outbox::channel();
        let mut session = SessionHandler::new(outbox, RoomRegistry::default());
        session.handle(ClientMessage::Move { index: 4 });
        session.handle(ClientMessage::ResetGame);
        session.handle_text("{not json");
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_disconnect_of_sole_occupant_removes_room() {
        let registry = RoomRegistry::default();
        let (outbox, _rx) = Outbox::channel();
        let mut session = SessionHandler::new(outbox, registry.clone());
        session.handle(ClientMessage::CreateRoom);
        let room_id = session.binding().unwrap().room_id().clone();

        session.disconnect();

        assert_eq!(
            registry.get(room_id.as_str()),
            Err(RoomError::RoomNotFound(room_id))
        );
        assert_eq!(registry.room_count(), 0);
    }
}
