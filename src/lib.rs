//! Postgres persistence for the modmail archive and multi-panel membership of
//! the moderation bot.
//!
//! Stores are plain values wrapping a shared [`sqlx::PgPool`]; nothing is cached
//! in process, so every read reflects the database at call time.

pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod migration;
pub mod models;
pub mod multi_panel_targets;
pub mod rows;

pub use archive::{ModmailArchiveStore, Window};
pub use config::DatabaseConfig;
pub use db::Database;
pub use error::{RowDecodeError, StoreError, StoreResult};
pub use models::{ArchiveRecord, MultiPanelId, Panel};
pub use multi_panel_targets::MultiPanelTargetStore;
pub use rows::RowSet;

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Install `env_logger` once per process. Later calls, or a logger installed by
/// the host application, are left alone.
pub fn init_logger() {
    LOGGER.call_once(|| {
        let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info,sqlx=warn"))
            .try_init();
    });
}


#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use chrono::{DateTime, Utc};
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::models::MultiPanelId;

    pub use database::{TestDatabase, TestDatabaseError};

    /// Helpers for seeding the collaborator tables and raw archive rows.
    pub struct TestFixtures<'a> {
        pool: &'a PgPool,
    }

    impl<'a> TestFixtures<'a> {
        pub fn new(pool: &'a PgPool) -> Self {
            Self { pool }
        }

        /// Insert a panel with placeholder content.
        pub async fn insert_panel(
            &self,
            message_id: i64,
            guild_id: i64,
            title: &str,
        ) -> Result<(), sqlx::Error> {
            sqlx::query(
                "INSERT INTO panels (message_id, channel_id, guild_id, title, content, colour, target_category, reaction_emote, welcome_message) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(message_id)
            .bind(message_id + 1)
            .bind(guild_id)
            .bind(title)
            .bind(format!("{title} content"))
            .bind(0x2ECC71_i32)
            .bind(message_id + 2)
            .bind("📩")
            .bind::<Option<String>>(None)
            .execute(self.pool)
            .await?;

            Ok(())
        }

        /// Insert a multi-panel and return its generated id.
        pub async fn insert_multi_panel(
            &self,
            message_id: i64,
            guild_id: i64,
        ) -> Result<MultiPanelId, sqlx::Error> {
            sqlx::query_scalar(
                "INSERT INTO multi_panels (message_id, channel_id, guild_id, title, content, colour) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            )
            .bind(message_id)
            .bind(message_id + 1)
            .bind(guild_id)
            .bind("Support")
            .bind("Pick a topic")
            .bind(0x3498DB_i32)
            .fetch_one(self.pool)
            .await
        }

        pub async fn delete_panel(&self, message_id: i64) -> Result<(), sqlx::Error> {
            sqlx::query("DELETE FROM panels WHERE message_id = $1")
                .bind(message_id)
                .execute(self.pool)
                .await?;
            Ok(())
        }

        pub async fn delete_multi_panel(&self, id: MultiPanelId) -> Result<(), sqlx::Error> {
            sqlx::query("DELETE FROM multi_panels WHERE id = $1")
                .bind(id)
                .execute(self.pool)
                .await?;
            Ok(())
        }

        /// Change a panel's primary key, as happens when its message is reposted.
        pub async fn move_panel(&self, from: i64, to: i64) -> Result<(), sqlx::Error> {
            sqlx::query("UPDATE panels SET message_id = $1 WHERE message_id = $2")
                .bind(to)
                .bind(from)
                .execute(self.pool)
                .await?;
            Ok(())
        }

        /// Write an archive row directly, bypassing the store's id checks.
        pub async fn insert_raw_archive(
            &self,
            id: Uuid,
            guild_id: i64,
            user_id: i64,
            close_time: DateTime<Utc>,
        ) -> Result<(), sqlx::Error> {
            sqlx::query(
                "INSERT INTO modmail_archive (uuid, guild_id, user_id, close_time) VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(guild_id)
            .bind(user_id)
            .bind(close_time)
            .execute(self.pool)
            .await?;
            Ok(())
        }
    }

    pub mod database {
        use log::LevelFilter;
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use sqlx::{ConnectOptions, PgPool};
        use testcontainers_modules::postgres::Postgres;
        use testcontainers_modules::testcontainers::{
            ContainerAsync, ImageExt, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use uuid::Uuid;

        use crate::migration::MIGRATOR;

        const POSTGRES_TAG: &str = "16-alpine";

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests.
        ///
        /// Each instance creates its own database on the target server, applies
        /// migrations, and drops it again on [`close`](Self::close) or drop.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            database_name: String,
            database_url: String,
            container: Option<ContainerAsync<Postgres>>,
        }

        impl TestDatabase {
            /// Provision against `TEST_DATABASE_URL` when it is set, otherwise
            /// against a disposable Postgres container.
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                match std::env::var("TEST_DATABASE_URL") {
                    Ok(url) if !url.trim().is_empty() => Self::provision(&url, None).await,
                    _ => Self::with_container().await,
                }
            }

            /// Launch a Postgres container and provision a database inside it.
            pub async fn with_container() -> Result<Self, TestDatabaseError> {
                let container = Postgres::default().with_tag(POSTGRES_TAG).start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                Self::provision(&admin_url, Some(container)).await
            }

            async fn provision(
                base_url: &str,
                container: Option<ContainerAsync<Postgres>>,
            ) -> Result<Self, TestDatabaseError> {
                let base_options: PgConnectOptions = base_url.parse()?;
                let base_options = base_options.log_statements(LevelFilter::Off);

                let base_name = base_options
                    .get_database()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "postgres".to_string());

                let admin_options = base_options.clone().database("postgres");
                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await?;

                let new_db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", new_db_name);
                sqlx::query(&create_sql).execute(&admin_pool).await?;
                admin_pool.close().await;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(base_options.database(&new_db_name))
                    .await?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    database_url: with_database(base_url, &new_db_name),
                    database_name: new_db_name,
                    container,
                })
            }

            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            /// Connection string of the provisioned database, for code that
            /// opens its own pool.
            pub fn database_url(&self) -> &str {
                &self.database_url
            }

            /// Close pool connections and drop the ephemeral database.
            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                if self.container.is_none() {
                    drop_database(self.admin_options.clone(), &self.database_name).await?;
                }

                Ok(())
            }
        }

        /// Swap the database path of a Postgres URL, keeping any query string.
        fn with_database(base_url: &str, database: &str) -> String {
            let (location, query) = match base_url.split_once('?') {
                Some((location, query)) => (location, Some(query)),
                None => (base_url, None),
            };

            let authority_start = location.find("://").map(|idx| idx + 3).unwrap_or(0);
            let server = match location[authority_start..].find('/') {
                Some(idx) => &location[..authority_start + idx],
                None => location,
            };

            match query {
                Some(query) => format!("{server}/{database}?{query}"),
                None => format!("{server}/{database}"),
            }
        }

        async fn drop_database(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_sql = format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", database_name);
            sqlx::query(&drop_sql).execute(&admin_pool).await?;
            admin_pool.close().await;
            Ok(())
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                let Some(pool) = self.pool.take() else {
                    return;
                };
                drop(pool);

                // A container takes its databases with it.
                if self.container.is_some() {
                    return;
                }

                let admin_options = self.admin_options.clone();
                let database_name = std::mem::take(&mut self.database_name);
                let cleanup = std::thread::spawn(move || {
                    let Ok(runtime) = tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    else {
                        return;
                    };
                    let _ = runtime.block_on(drop_database(admin_options, &database_name));
                });
                let _ = cleanup.join();
            }
        }

    }
}
