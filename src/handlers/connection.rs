use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;
use uuid::Uuid;

use crate::error::AppResult;
use crate::message::ServerEvent;
use crate::router::{ConnectionId, DeliveryRouter};

pub type WebSocketStreamType = WebSocketStream<TcpStream>;

/// State of one live connection: its verified identity, the room it joined
/// (if any) and the outbound half of the socket.
pub struct ConnectionHandler {
    ws_sender: SplitSink<WebSocketStreamType, WsMessage>,
    tx: mpsc::UnboundedSender<ServerEvent>,
    connection_id: ConnectionId,
    identity: Uuid,
    joined: Option<Uuid>,
    addr: SocketAddr,
}

impl ConnectionHandler {
    pub fn new(
        ws_sender: SplitSink<WebSocketStreamType, WsMessage>,
        tx: mpsc::UnboundedSender<ServerEvent>,
        addr: SocketAddr,
        identity: Uuid,
    ) -> Self {
        Self {
            ws_sender,
            tx,
            connection_id: Uuid::new_v4(),
            identity,
            joined: None,
            addr,
        }
    }

    /// Identity this connection authenticated as during the handshake.
    pub fn identity(&self) -> Uuid {
        self.identity
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn tx(&self) -> &mpsc::UnboundedSender<ServerEvent> {
        &self.tx
    }

    pub fn mark_joined(&mut self, room: Uuid) {
        self.joined = Some(room);
    }

    /// Serializes an event to a binary msgpack frame and writes it out.
    pub async fn send_event(&mut self, event: &ServerEvent) -> AppResult<()> {
        let bytes = rmp_serde::to_vec_named(event)?;
        self.ws_sender.send(WsMessage::Binary(bytes)).await?;
        Ok(())
    }

    pub async fn send_error(&mut self, code: &str, message: &str) {
        let event = ServerEvent::Error {
            code: code.to_string(),
            message: message.to_string(),
        };
        if self.send_event(&event).await.is_err() {
            tracing::debug!("Failed to send error to disconnected client {}", self.addr);
        }
    }

    pub async fn send_pong(&mut self, data: Vec<u8>) {
        let _ = self.ws_sender.send(WsMessage::Pong(data)).await;
    }

    /// Removes the connection from its room, if it ever joined one.
    pub async fn disconnect(&mut self, router: &DeliveryRouter) {
        if let Some(room) = self.joined.take() {
            router.leave(room, self.connection_id).await;
        }
    }
}
