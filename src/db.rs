use sqlx::PgPool;

use crate::archive::ModmailArchiveStore;
use crate::config::DatabaseConfig;
use crate::error::StoreResult;
use crate::migration;
use crate::multi_panel_targets::MultiPanelTargetStore;

/// Handle to the bot database, one store per table.
///
/// Built once at start-up and shared; cloning only clones the pool handle.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    pub modmail_archive: ModmailArchiveStore,
    pub multi_panel_targets: MultiPanelTargetStore,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            modmail_archive: ModmailArchiveStore::new(pool.clone()),
            multi_panel_targets: MultiPanelTargetStore::new(pool.clone()),
            pool,
        }
    }

    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = config.connect().await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        migration::run_migrations(&self.pool).await
    }

    /// Round-trip a trivial statement to confirm the pool can reach Postgres.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
