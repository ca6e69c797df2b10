// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: router assembly and middleware
// - extractors.rs: AuthenticatedUser bearer-token extractor
// - middleware.rs: request logging
// - messages.rs: send / history / conversations endpoints
// - users.rs: user projection endpoint
// - health.rs: health check and metrics endpoints
//
// ============================================================================

mod extractors;
mod health;
mod messages;
mod middleware;
mod users;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::context::AppContext;

/// Create the main application router with all routes
pub fn create_router(ctx: Arc<AppContext>) -> Router {
    let cors = cors_layer(&ctx.config);

    Router::new()
        // Health and monitoring
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        // Messages
        .route("/api/messages", post(messages::send_message))
        .route(
            "/api/messages/conversations",
            get(messages::get_conversations),
        )
        .route("/api/messages/:partner_id", get(messages::get_history))
        // Users
        .route("/api/users/:user_id", get(users::get_user))
        // Apply middleware (order matters - last added runs first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::request_logging))
                .layer(cors)
                .into_inner(),
        )
        .with_state(ctx)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
