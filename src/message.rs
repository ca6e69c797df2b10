use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A persisted message row. Append-only; `(created_at, seq)` is the store's
/// total order.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredMessage {
    pub id: Uuid,
    pub sender: Uuid,
    pub receiver: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub seq: i64,
}

/// One party of a composed message. `name`/`avatar` are absent when the
/// user directory cannot project the identity; that never fails a send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Participant {
    /// An identity the directory could not resolve.
    pub fn unresolved(id: Uuid) -> Self {
        Self {
            id,
            name: None,
            avatar: None,
        }
    }
}

/// A message as returned to any boundary: persisted fields plus both
/// parties' directory projections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedMessage {
    pub id: Uuid,
    pub sender: Participant,
    pub receiver: Participant,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Client -> server events on the live channel.
///
/// Identity fields are plain strings here; the handlers format-check them so
/// a malformed id is a validation rejection, not a codec fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    Join {
        user_id: String,
    },
    Send {
        sender: String,
        receiver: String,
        text: String,
    },
    TypingStarted {
        sender: String,
        receiver: String,
    },
    TypingStopped {
        sender: String,
        receiver: String,
    },
}

/// Server -> client events on the live channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    MessageDelivered(ComposedMessage),
    TypingStarted { sender: Uuid },
    TypingStopped { sender: Uuid },
    Error { code: String, message: String },
}
