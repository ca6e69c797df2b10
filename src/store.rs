//! Message store: the durable source of truth for direct messages.
//!
//! Identities are format-checked here (UUID parse) but never checked for
//! existence; the store stays ignorant of the user directory.

use uuid::Uuid;

use crate::config::MAX_MESSAGE_TEXT_BYTES;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::message::StoredMessage;

/// Format-checks an identity string.
pub fn parse_identity(raw: &str, field: &str) -> AppResult<Uuid> {
    if raw.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Uuid::parse_str(raw)
        .map_err(|_| AppError::validation(format!("{} is not a valid user id", field)))
}

/// Rejects empty and oversized message text.
pub fn validate_text(text: &str) -> AppResult<()> {
    if text.is_empty() {
        return Err(AppError::validation("Message text is required"));
    }
    if text.len() > MAX_MESSAGE_TEXT_BYTES {
        return Err(AppError::validation(format!(
            "Message text exceeds maximum of {} bytes",
            MAX_MESSAGE_TEXT_BYTES
        )));
    }
    Ok(())
}

/// Persists one message. The store assigns id, timestamp and sequence;
/// the returned row is the durable record.
pub async fn persist(
    pool: &DbPool,
    sender: &str,
    receiver: &str,
    text: &str,
) -> AppResult<StoredMessage> {
    let sender = parse_identity(sender, "sender")?;
    let receiver = parse_identity(receiver, "receiver")?;
    validate_text(text)?;

    let message = sqlx::query_as::<_, StoredMessage>(
        r#"
        INSERT INTO messages (sender, receiver, text)
        VALUES ($1, $2, $3)
        RETURNING id, sender, receiver, text, created_at, seq
        "#,
    )
    .bind(sender)
    .bind(receiver)
    .bind(text)
    .fetch_one(pool)
    .await?;

    Ok(message)
}

/// All messages between `a` and `b`, in either direction, ascending by
/// `(created_at, seq)`.
pub async fn history(pool: &DbPool, a: Uuid, b: Uuid) -> AppResult<Vec<StoredMessage>> {
    let messages = sqlx::query_as::<_, StoredMessage>(
        r#"
        SELECT id, sender, receiver, text, created_at, seq
        FROM messages
        WHERE (sender = $1 AND receiver = $2)
           OR (sender = $2 AND receiver = $1)
        ORDER BY created_at ASC, seq ASC
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

/// All messages where `user` is sender or receiver, descending by
/// `(created_at, seq)`.
pub async fn all_involving(pool: &DbPool, user: Uuid) -> AppResult<Vec<StoredMessage>> {
    let messages = sqlx::query_as::<_, StoredMessage>(
        r#"
        SELECT id, sender, receiver, text, created_at, seq
        FROM messages
        WHERE sender = $1 OR receiver = $1
        ORDER BY created_at DESC, seq DESC
        "#,
    )
    .bind(user)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}
