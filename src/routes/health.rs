// ============================================================================
// Health and Metrics Routes
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::health;
use crate::metrics;

/// GET /health
pub async fn health_check(
    State(ctx): State<Arc<AppContext>>,
) -> Result<impl IntoResponse, AppError> {
    match health::health_check(&ctx.db_pool).await {
        Ok(_) => Ok((StatusCode::OK, "OK")),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            Ok((StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable"))
        }
    }
}

/// GET /metrics
pub async fn metrics() -> Result<impl IntoResponse, AppError> {
    match metrics::gather_metrics() {
        Ok(metrics_data) => Ok((
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            metrics_data,
        )),
        Err(e) => {
            tracing::error!("Failed to gather metrics: {}", e);
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain")],
                "Internal Server Error".to_string(),
            ))
        }
    }
}
