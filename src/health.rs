use crate::db::DbPool;
use crate::error::AppResult;

pub async fn health_check(pool: &DbPool) -> AppResult<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
