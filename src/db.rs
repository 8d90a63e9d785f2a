use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::AppError;

pub type DbPool = SqlitePool;

const MAX_CONNECTIONS: u32 = 10;

/// Open the sqlite pool backing trips, users, and sessions. Migrations run
/// separately at startup.
pub async fn init_pool(database_url: &str) -> Result<DbPool, AppError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await?;
    debug!("database pool ready at {database_url}");
    Ok(pool)
}
