use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use parley_server::auth::AuthManager;
use parley_server::config::Config;
use parley_server::context::AppContext;
use parley_server::router::DeliveryRouter;
use parley_server::{db, handlers, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env().context("load configuration")?);

    let db_pool = db::create_pool(&config).await.context("connect to Postgres")?;
    db::run_migrations(&db_pool).await.context("run migrations")?;
    tracing::info!("Connected to database");

    let auth = Arc::new(AuthManager::new(&config).context("initialize auth manager")?);
    let router = Arc::new(DeliveryRouter::new(config.logging.hash_salt.clone()));

    let ctx = AppContext::new(db_pool, auth, router, config.clone());

    // Live channel listener
    let ws_addr = format!("{}:{}", config.host, config.ws_port);
    let ws_listener = TcpListener::bind(&ws_addr)
        .await
        .with_context(|| format!("bind WebSocket listener on {}", ws_addr))?;
    tracing::info!("Live channel listening on ws://{}", ws_addr);
    tokio::spawn(handlers::serve(ws_listener, ctx.clone()));

    // HTTP API listener
    let http_addr = format!("{}:{}", config.host, config.http_port);
    let http_listener = TcpListener::bind(&http_addr)
        .await
        .with_context(|| format!("bind HTTP listener on {}", http_addr))?;
    tracing::info!("HTTP API listening on http://{}", http_addr);

    let app = routes::create_router(Arc::new(ctx));
    axum::serve(http_listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
