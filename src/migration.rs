//! Schema management.
//!
//! Every migration creates its objects with `IF NOT EXISTS`, so applying them
//! against a database that already carries the bot's tables never drops data.
//! An archive table from an earlier bot version has its `close_time` converted
//! from `TIMESTAMP` (UTC wall clock) to `TIMESTAMPTZ` in place.

use sqlx::PgPool;
use sqlx::migrate::Migrator;

use crate::error::StoreResult;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply any pending migrations. Already-applied migrations are skipped.
pub async fn run_migrations(pool: &PgPool) -> StoreResult<()> {
    log::info!("checking database migration state");

    MIGRATOR.run(pool).await?;

    log::info!("database migrations up to date");
    Ok(())
}
