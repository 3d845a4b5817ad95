//! Per-connection outbound channel.
//!
//! The session core never writes to a socket directly. Each connection owns
//! an unbounded channel; the socket writer task drains it. Sending never
//! blocks, so fan-out can happen while a room lock is held.

use crate::error::TransportError;
use crate::protocol::ServerMessage;
use derive_more::Display;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// Transient handle identifying one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[display("conn-{}", _0)]
pub struct ConnectionId(u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    /// Allocates a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Sending half of a connection's outbound queue.
#[derive(Debug, Clone)]
pub struct Outbox {
    connection: ConnectionId,
    tx: mpsc::UnboundedSender<ServerMessage>,
}

impl Outbox {
    /// Creates an outbox for a fresh connection along with its receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        Self::for_connection(ConnectionId::next())
    }

    /// Creates an outbox for a known connection id.
    pub fn for_connection(
        connection: ConnectionId,
    ) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { connection, tx }, rx)
    }

    /// Connection this outbox delivers to.
    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    /// Queues a message. Fails only when the peer has gone away.
    pub fn try_send(&self, message: ServerMessage) -> Result<(), TransportError> {
        self.tx.send(message).map_err(|_| TransportError::Closed)
    }

    /// Queues a message, logging and discarding delivery failures.
    pub fn send(&self, message: ServerMessage) {
        if let Err(e) = self.try_send(message) {
            debug!(connection = %self.connection, error = %e, "Dropping message for closed connection");
        }
    }

    /// True once the receiving half is gone.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
