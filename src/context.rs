use std::sync::Arc;

use crate::auth::AuthManager;
use crate::config::Config;
use crate::db::DbPool;
use crate::router::DeliveryRouter;

/// Application context containing shared dependencies.
/// Cloned into every connection task and REST handler.
#[derive(Clone)]
pub struct AppContext {
    pub db_pool: DbPool,
    pub auth: Arc<AuthManager>,
    pub router: Arc<DeliveryRouter>,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(
        db_pool: DbPool,
        auth: Arc<AuthManager>,
        router: Arc<DeliveryRouter>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            db_pool,
            auth,
            router,
            config,
        }
    }
}
