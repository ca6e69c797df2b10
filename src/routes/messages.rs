// ============================================================================
// Messages Routes
// ============================================================================
//
// Endpoints:
// - POST /api/messages                  - Send a message
// - GET  /api/messages/conversations    - Latest message per partner
// - GET  /api/messages/:partner_id      - History with one partner
//
// Sending over this path persists and returns the composed message but does
// not fan out through the delivery router; live delivery happens only on the
// WebSocket send path. Receivers observe REST-sent messages on their next
// fetch.
//
// ============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::context::AppContext;
use crate::conversations;
use crate::directory;
use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::routes::extractors::AuthenticatedUser;
use crate::store;
use crate::utils::log_safe_id;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub receiver: String,
    #[serde(default)]
    pub text: String,
}

/// POST /api/messages
pub async fn send_message(
    State(ctx): State<Arc<AppContext>>,
    user: AuthenticatedUser,
    Json(request): Json<SendMessageRequest>,
) -> AppResult<impl IntoResponse> {
    if request.receiver.is_empty() || request.text.is_empty() {
        return Err(AppError::validation(
            "Receiver ID and message text are required",
        ));
    }

    let caller = user.0.to_string();
    let stored = store::persist(&ctx.db_pool, &caller, &request.receiver, &request.text).await?;
    metrics::MESSAGES_SENT_TOTAL.inc();

    if ctx.config.logging.log_user_ids {
        tracing::info!(
            message_id = %stored.id,
            sender = %stored.sender,
            receiver = %stored.receiver,
            "Message persisted via REST"
        );
    } else {
        let salt = &ctx.config.logging.hash_salt;
        tracing::info!(
            message_id = %stored.id,
            sender_hash = %log_safe_id(&stored.sender.to_string(), salt),
            receiver_hash = %log_safe_id(&stored.receiver.to_string(), salt),
            "Message persisted via REST"
        );
    }

    let mut composed = directory::compose_all(&ctx.db_pool, vec![stored]).await?;
    let message = composed
        .pop()
        .ok_or_else(|| AppError::internal("Composed message vanished"))?;

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /api/messages/:partner_id
pub async fn get_history(
    State(ctx): State<Arc<AppContext>>,
    user: AuthenticatedUser,
    Path(partner_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let partner = store::parse_identity(&partner_id, "partner")?;

    let messages = store::history(&ctx.db_pool, user.0, partner).await?;
    let composed = directory::compose_all(&ctx.db_pool, messages).await?;

    Ok((StatusCode::OK, Json(composed)))
}

/// GET /api/messages/conversations
///
/// The inbox is recomputed from the store on every call; there is no
/// aggregate table.
pub async fn get_conversations(
    State(ctx): State<Arc<AppContext>>,
    user: AuthenticatedUser,
) -> AppResult<impl IntoResponse> {
    let involving = store::all_involving(&ctx.db_pool, user.0).await?;
    let latest = conversations::latest_per_partner(user.0, &involving);
    let composed = directory::compose_all(&ctx.db_pool, latest).await?;

    Ok((StatusCode::OK, Json(composed)))
}
