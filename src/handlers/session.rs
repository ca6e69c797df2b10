use uuid::Uuid;

use crate::context::AppContext;
use crate::handlers::connection::ConnectionHandler;
use crate::utils::log_safe_id;

/// Binds a connection to the room of its own identity.
///
/// The claimed identity must match the identity the connection
/// authenticated as during the handshake; a mismatch is a no-op inside the
/// router and nothing is reported back to the claimant.
pub async fn handle_join(handler: &mut ConnectionHandler, ctx: &AppContext, user_id: String) {
    let claimed = match Uuid::parse_str(&user_id) {
        Ok(id) => id,
        Err(_) => {
            handler
                .send_error("VALIDATION_ERROR", "userId is not a valid user id")
                .await;
            return;
        }
    };

    let joined = ctx
        .router
        .join(
            handler.connection_id(),
            claimed,
            handler.identity(),
            handler.tx().clone(),
        )
        .await;

    if joined {
        handler.mark_joined(claimed);
        if ctx.config.logging.log_user_ids {
            tracing::info!(user_id = %claimed, "User joined their room");
        } else {
            tracing::info!(
                user_hash = %log_safe_id(&claimed.to_string(), &ctx.config.logging.hash_salt),
                "User joined their room"
            );
        }
    }
}
