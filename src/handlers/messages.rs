use std::collections::HashMap;

use uuid::Uuid;

use crate::context::AppContext;
use crate::directory;
use crate::error::AppError;
use crate::handlers::connection::ConnectionHandler;
use crate::message::ServerEvent;
use crate::metrics;
use crate::store;
use crate::utils::log_safe_id;

/// Handles a live `send` event.
///
/// Validation failures go back to the caller as an `error` event and the
/// connection stays open. A claimed sender that does not match the
/// connection's identity is dropped without any reply. Persistence is the
/// durable step; fan-out afterwards is best-effort.
pub async fn handle_send(
    handler: &mut ConnectionHandler,
    ctx: &AppContext,
    sender: String,
    receiver: String,
    text: String,
) {
    if receiver.is_empty() || text.is_empty() {
        handler
            .send_error(
                "VALIDATION_ERROR",
                "Receiver and message text are required",
            )
            .await;
        return;
    }

    // Never trust the client-asserted sender.
    let identity = handler.identity();
    if Uuid::parse_str(&sender).map(|s| s != identity).unwrap_or(true) {
        tracing::warn!(
            connection = %handler.connection_id(),
            "Send dropped: claimed sender does not match connection identity"
        );
        return;
    }

    let stored = match store::persist(&ctx.db_pool, &sender, &receiver, &text).await {
        Ok(message) => message,
        Err(AppError::Validation(reason)) => {
            handler.send_error("VALIDATION_ERROR", &reason).await;
            return;
        }
        Err(e) => {
            // Internal fault on the live channel: log, drop the event.
            e.log();
            return;
        }
    };
    metrics::MESSAGES_SENT_TOTAL.inc();

    if ctx.config.logging.log_user_ids {
        tracing::info!(
            message_id = %stored.id,
            sender = %stored.sender,
            receiver = %stored.receiver,
            "Message persisted"
        );
    } else {
        let salt = &ctx.config.logging.hash_salt;
        tracing::info!(
            message_id = %stored.id,
            sender_hash = %log_safe_id(&stored.sender.to_string(), salt),
            receiver_hash = %log_safe_id(&stored.receiver.to_string(), salt),
            "Message persisted"
        );
    }

    // An unavailable projection must not fail an already-persisted send.
    let profiles = match directory::project_many(&ctx.db_pool, &[stored.sender, stored.receiver])
        .await
    {
        Ok(profiles) => profiles,
        Err(e) => {
            tracing::warn!(error = %e, message_id = %stored.id, "Profile projection unavailable");
            HashMap::new()
        }
    };

    let sender_id = stored.sender;
    let receiver_id = stored.receiver;
    let event = ServerEvent::MessageDelivered(directory::compose(stored, &profiles));

    let mut delivered = ctx.router.publish(receiver_id, event.clone()).await;
    if sender_id != receiver_id {
        // Echo to the sender's other connections.
        delivered += ctx.router.publish(sender_id, event).await;
    }
    metrics::EVENTS_DELIVERED_TOTAL.inc_by(delivered as u64);

    tracing::debug!(delivered = delivered, "Message fanned out");
}

/// Handles `typingStarted` / `typingStopped`.
///
/// Same validate-then-authorize shape as `handle_send`, but fan-out goes to
/// the receiver only and nothing is ever persisted.
pub async fn handle_typing(
    handler: &mut ConnectionHandler,
    ctx: &AppContext,
    sender: String,
    receiver: String,
    started: bool,
) {
    if receiver.is_empty() {
        handler
            .send_error("VALIDATION_ERROR", "Receiver is required")
            .await;
        return;
    }

    let identity = handler.identity();
    if Uuid::parse_str(&sender).map(|s| s != identity).unwrap_or(true) {
        tracing::warn!(
            connection = %handler.connection_id(),
            "Typing event dropped: claimed sender does not match connection identity"
        );
        return;
    }

    let receiver_id = match Uuid::parse_str(&receiver) {
        Ok(id) => id,
        Err(_) => {
            handler
                .send_error("VALIDATION_ERROR", "Receiver is not a valid user id")
                .await;
            return;
        }
    };

    let event = if started {
        ServerEvent::TypingStarted { sender: identity }
    } else {
        ServerEvent::TypingStopped { sender: identity }
    };

    let delivered = ctx.router.publish(receiver_id, event).await;
    metrics::EVENTS_DELIVERED_TOTAL.inc_by(delivered as u64);
}
