//! User directory: read-only public projections of identities.
//!
//! The messaging core consumes this as a collaborator contract. A missing
//! row is only a 404 where a user resource is addressed directly; on message
//! paths an unresolvable identity degrades to an id-only participant.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::AppResult;
use crate::message::{ComposedMessage, Participant, StoredMessage};

/// Public projection of one user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
}

/// Looks up the projection for a single identity.
pub async fn project(pool: &DbPool, id: Uuid) -> AppResult<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, name, avatar
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

/// Looks up projections for a set of identities in one round trip.
pub async fn project_many(pool: &DbPool, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Profile>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let profiles = sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, name, avatar
        FROM users
        WHERE id = ANY($1)
        "#,
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(profiles.into_iter().map(|p| (p.id, p)).collect())
}

fn participant(id: Uuid, profiles: &HashMap<Uuid, Profile>) -> Participant {
    match profiles.get(&id) {
        Some(p) => Participant {
            id,
            name: Some(p.name.clone()),
            avatar: Some(p.avatar.clone()),
        },
        None => Participant::unresolved(id),
    }
}

/// Attaches both parties' projections to a stored message.
pub fn compose(message: StoredMessage, profiles: &HashMap<Uuid, Profile>) -> ComposedMessage {
    ComposedMessage {
        id: message.id,
        sender: participant(message.sender, profiles),
        receiver: participant(message.receiver, profiles),
        text: message.text,
        created_at: message.created_at,
    }
}

/// Projects and composes a batch of stored messages.
pub async fn compose_all(
    pool: &DbPool,
    messages: Vec<StoredMessage>,
) -> AppResult<Vec<ComposedMessage>> {
    let mut ids: Vec<Uuid> = Vec::new();
    for m in &messages {
        if !ids.contains(&m.sender) {
            ids.push(m.sender);
        }
        if !ids.contains(&m.receiver) {
            ids.push(m.receiver);
        }
    }

    let profiles = project_many(pool, &ids).await?;
    Ok(messages
        .into_iter()
        .map(|m| compose(m, &profiles))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn unknown_identity_composes_to_id_only_participant() {
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();
        let mut profiles = HashMap::new();
        profiles.insert(
            sender,
            Profile {
                id: sender,
                name: "Alice".to_string(),
                avatar: "/a.png".to_string(),
            },
        );

        let composed = compose(
            StoredMessage {
                id: Uuid::new_v4(),
                sender,
                receiver,
                text: "hi".to_string(),
                created_at: Utc::now(),
                seq: 1,
            },
            &profiles,
        );

        assert_eq!(composed.sender.name.as_deref(), Some("Alice"));
        assert_eq!(composed.receiver.id, receiver);
        assert!(composed.receiver.name.is_none());
    }
}
