pub mod connection;
mod messages;
mod session;

use futures_util::StreamExt;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_hdr_async_with_config;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

use crate::auth::{bearer_token, AuthManager};
use crate::config::MAX_WEBSOCKET_MESSAGE_SIZE;
use crate::context::AppContext;
use crate::error::{AppError, AppResult};
use crate::message::ClientEvent;
use crate::metrics;
use connection::ConnectionHandler;

/// Accept loop for the live channel. One task per connection.
pub async fn serve(listener: TcpListener, ctx: AppContext) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let ctx = ctx.clone();
                tokio::spawn(async move {
                    handle_connection(stream, addr, ctx).await;
                });
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept connection");
            }
        }
    }
}

/// Extracts and verifies the bearer credential from the upgrade request.
///
/// Accepts `Authorization: Bearer <token>` or a `token` query parameter.
fn authorize_handshake(auth: &AuthManager, req: &Request) -> AppResult<Uuid> {
    let header_token = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(bearer_token);

    let token = header_token
        .or_else(|| query_token(req.uri().query()))
        .ok_or_else(|| AppError::auth("Missing credentials in handshake"))?;

    auth.verify_identity(token)
}

fn query_token(query: Option<&str>) -> Option<&str> {
    query?
        .split('&')
        .find_map(|pair| pair.strip_prefix("token="))
        .filter(|t| !t.is_empty())
}

fn ws_config() -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(MAX_WEBSOCKET_MESSAGE_SIZE);
    config.max_frame_size = Some(MAX_WEBSOCKET_MESSAGE_SIZE);
    config
}

/// Authenticates the handshake, then runs the connection's event loop:
/// inbound socket frames and the room's outbound queue multiplexed in one
/// task. Authentication failure refuses the upgrade before any state exists.
pub async fn handle_connection(stream: TcpStream, addr: SocketAddr, ctx: AppContext) {
    let auth = ctx.auth.clone();
    let mut identity: Option<Uuid> = None;

    let callback = |req: &Request, response: Response| match authorize_handshake(&auth, req) {
        Ok(user) => {
            identity = Some(user);
            Ok(response)
        }
        Err(e) => {
            tracing::warn!(error = %e, addr = %addr, "WebSocket handshake refused");
            let mut refusal = ErrorResponse::new(Some(e.user_message()));
            *refusal.status_mut() = StatusCode::UNAUTHORIZED;
            Err(refusal)
        }
    };

    let ws_stream = match accept_hdr_async_with_config(stream, callback, Some(ws_config())).await {
        Ok(ws) => ws,
        Err(e) => {
            tracing::debug!(error = %e, addr = %addr, "WebSocket upgrade failed");
            return;
        }
    };
    let Some(identity) = identity else {
        return;
    };

    metrics::CONNECTIONS_TOTAL.inc();
    tracing::info!(addr = %addr, "New connection established");

    let (ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut handler = ConnectionHandler::new(ws_sender, tx, addr, identity);

    loop {
        tokio::select! {
            Some(msg) = ws_receiver.next() => {
                match msg {
                    Ok(WsMessage::Binary(data)) => {
                        match rmp_serde::from_slice::<ClientEvent>(&data) {
                            Ok(ClientEvent::Join { user_id }) => {
                                session::handle_join(&mut handler, &ctx, user_id).await;
                            }
                            Ok(ClientEvent::Send { sender, receiver, text }) => {
                                messages::handle_send(&mut handler, &ctx, sender, receiver, text)
                                    .await;
                            }
                            Ok(ClientEvent::TypingStarted { sender, receiver }) => {
                                messages::handle_typing(&mut handler, &ctx, sender, receiver, true)
                                    .await;
                            }
                            Ok(ClientEvent::TypingStopped { sender, receiver }) => {
                                messages::handle_typing(&mut handler, &ctx, sender, receiver, false)
                                    .await;
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse event from {}: {}", addr, e);
                                handler.send_error("INVALID_FORMAT", "Invalid event format").await;
                            }
                        }
                    }
                    Ok(WsMessage::Close(_)) => {
                        tracing::info!("Connection closed by client: {}", addr);
                        break;
                    }
                    Ok(WsMessage::Ping(data)) => {
                        handler.send_pong(data).await;
                    }
                    Err(e) => {
                        tracing::error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    _ => {}
                }
            }

            Some(event) = rx.recv() => {
                if handler.send_event(&event).await.is_err() {
                    break;
                }
            }

            else => break,
        }
    }

    handler.disconnect(&ctx.router).await;
    tracing::info!("Connection closed: {}", addr);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_token_finds_the_token_pair() {
        assert_eq!(query_token(Some("token=abc")), Some("abc"));
        assert_eq!(query_token(Some("a=1&token=abc&b=2")), Some("abc"));
        assert_eq!(query_token(Some("token=")), None);
        assert_eq!(query_token(Some("a=1")), None);
        assert_eq!(query_token(None), None);
    }
}
