// ============================================================================
// Axum Extractors
// ============================================================================
//
// - AuthenticatedUser: extracts and verifies the bearer token from the
//   Authorization header; the caller identity always comes from the
//   credential, never from the request body.
//
// ============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::bearer_token;
use crate::context::AppContext;
use crate::error::AppError;

/// Extractor for the authenticated caller's identity.
///
/// Usage:
/// ```rust,ignore
/// async fn handler(user: AuthenticatedUser, ...) -> Result<...> {
///     let user_id = user.0;
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Uuid);

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = verify_bearer(state, &parts.headers).map_err(|e| {
            tracing::warn!(error = %e, "Request authentication failed");
            let status = e.status_code();
            let body = json!({
                "error": e.user_message(),
                "error_code": e.error_code(),
            });
            (status, axum::Json(body)).into_response()
        })?;

        Ok(AuthenticatedUser(user_id))
    }
}

fn verify_bearer(ctx: &AppContext, headers: &HeaderMap) -> Result<Uuid, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::auth("Missing Authorization header"))?;

    let token = bearer_token(auth_header)
        .ok_or_else(|| AppError::auth("Invalid Authorization header format"))?;

    ctx.auth.verify_identity(token)
}
