//! HTTP/WebSocket front end.
//!
//! Each accepted socket gets a [`SessionHandler`] fed by a reader loop and an
//! [`Outbox`] drained by a spawned writer task.

use crate::config::ServerConfig;
use crate::protocol::ServerMessage;
use crate::registry::RoomRegistry;
use crate::session::SessionHandler;
use crate::transport::{ConnectionId, Outbox};
use anyhow::Result;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Shared state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    registry: RoomRegistry,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Always `"ok"` while the process is serving.
    pub status: String,
    /// Number of live rooms.
    pub rooms: usize,
}

/// The room server: a registry plus its routes.
#[derive(Debug, Clone)]
pub struct RoomServer {
    registry: RoomRegistry,
    ws_path: String,
}

impl RoomServer {
    /// Builds a server with a fresh registry from validated config.
    #[instrument(skip(config))]
    pub fn from_config(config: &ServerConfig) -> Result<Self> {
        config.validate()?;
        let rules = config.game_kind()?.rules();
        let registry = RoomRegistry::new(rules, *config.room_code_length());
        Ok(Self::new(registry, config.ws_path().clone()))
    }

    /// Builds a server around an existing registry.
    pub fn new(registry: RoomRegistry, ws_path: impl Into<String>) -> Self {
        Self {
            registry,
            ws_path: ws_path.into(),
        }
    }

    /// Registry backing this server.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Routes: the WebSocket endpoint and `/health`.
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
        };
        Router::new()
            .route(&self.ws_path, get(ws_handler))
            .route("/health", get(health_handler))
            .with_state(state)
    }

    /// Serves on `listener` until `shutdown` resolves.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let addr = listener.local_addr()?;
        info!(%addr, ws_path = %self.ws_path, "Room server listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        info!("Room server stopped");
        Ok(())
    }
}

/// Binds the configured address and serves until Ctrl-C.
#[instrument(skip(config))]
pub async fn serve(config: ServerConfig) -> Result<()> {
    let server = RoomServer::from_config(&config)?;
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Server ready at ws://{}{}", listener.local_addr()?, config.ws_path());
    server.run(listener, shutdown_signal()).await
}

/// Resolves on Ctrl-C.
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl-C"),
    }
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".to_string(),
        rooms: state.registry.room_count(),
    })
}

#[instrument(skip_all)]
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    debug!("WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state.registry))
}

async fn handle_socket(socket: WebSocket, registry: RoomRegistry) {
    let (ws_tx, ws_rx) = socket.split();
    run_connection(ws_rx, ws_tx, registry).await;
}

/// Pumps one connection until the peer closes, a read fails, or a write
/// fails. Either way the session leaves its room.
async fn run_connection<R, W, E>(mut ws_rx: R, ws_tx: W, registry: RoomRegistry)
where
    R: Stream<Item = Result<Message, E>> + Unpin,
    W: Sink<Message> + Send + Unpin + 'static,
    E: std::fmt::Display,
{
    let (outbox, outbound) = Outbox::channel();
    let connection = outbox.connection();
    let (control_tx, control_rx) = mpsc::unbounded_channel::<Message>();
    info!(%connection, "WebSocket connected");

    let mut writer = tokio::spawn(write_frames(connection, ws_tx, outbound, control_rx));
    let mut session = SessionHandler::new(outbox, registry);

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            _ = &mut writer => {
                debug!(%connection, "Writer stopped, closing connection");
                break;
            }
        };
        match frame {
            Some(Ok(Message::Text(text))) => session.handle_text(text.as_str()),
            Some(Ok(Message::Ping(data))) => {
                let _ = control_tx.send(Message::Pong(data));
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(Message::Binary(_))) => debug!(%connection, "Ignoring binary frame"),
            Some(Ok(Message::Pong(_))) => {}
            Some(Err(e)) => {
                debug!(%connection, error = %e, "WebSocket read failed");
                break;
            }
        }
    }

    session.disconnect();
    writer.abort();
    info!(%connection, "WebSocket disconnected");
}

async fn write_frames<W>(
    connection: ConnectionId,
    mut ws_tx: W,
    mut outbound: mpsc::UnboundedReceiver<ServerMessage>,
    mut control: mpsc::UnboundedReceiver<Message>,
) where
    W: Sink<Message> + Unpin,
{
    loop {
        let frame = tokio::select! {
            Some(message) = outbound.recv() => match message.encode() {
                Ok(text) => Message::Text(text.into()),
                Err(e) => {
                    warn!(%connection, error = %e, "Failed to encode message");
                    continue;
                }
            },
            Some(frame) = control.recv() => frame,
            else => break,
        };
        if ws_tx.send(frame).await.is_err() {
            debug!(%connection, "WebSocket write failed");
            break;
        }
    }
}
