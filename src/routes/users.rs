// ============================================================================
// Users Routes
// ============================================================================
//
// Endpoints:
// - GET /api/users/:user_id - Public projection of one user
//
// This is the one place a missing directory entry is a 404: the resource is
// addressed directly. Message paths never require the directory to succeed.
//
// ============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::context::AppContext;
use crate::directory;
use crate::error::{AppError, AppResult};
use crate::routes::extractors::AuthenticatedUser;
use crate::store;

/// GET /api/users/:user_id
pub async fn get_user(
    State(ctx): State<Arc<AppContext>>,
    _user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = store::parse_identity(&user_id, "user_id")?;

    let profile = directory::project(&ctx.db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;

    Ok((StatusCode::OK, Json(profile)))
}
