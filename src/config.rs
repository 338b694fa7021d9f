use std::env;
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::ConnectOptions;

use crate::error::{StoreError, StoreResult};

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_duration_millis(key: &str, default_millis: u64) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or_else(|| Duration::from_millis(default_millis))
}

fn env_level(key: &str, default: LevelFilter) -> LevelFilter {
    env::var(key)
        .ok()
        .and_then(|value| LevelFilter::from_str(value.trim()).ok())
        .unwrap_or(default)
}

/// Connection pool settings for the bot database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    /// Level at which sqlx logs every executed statement.
    pub log_statements: LevelFilter,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            log_statements: LevelFilter::Debug,
        }
    }

    /// Read settings from `DATABASE_*` environment variables.
    ///
    /// Only `DATABASE_URL` is required.
    pub fn from_env() -> StoreResult<Self> {
        let url = env::var("DATABASE_URL")
            .map_err(|_| StoreError::Config("DATABASE_URL is not set".to_string()))?;

        let defaults = Self::new(url);
        let config = Self {
            max_connections: env_u32("DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_u32("DATABASE_MIN_CONNECTIONS", defaults.min_connections),
            acquire_timeout: env_duration_millis("DATABASE_ACQUIRE_TIMEOUT_MS", 30_000),
            log_statements: env_level("DATABASE_LOG_STATEMENTS", defaults.log_statements),
            ..defaults
        };
        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> StoreResult<()> {
        if self.max_connections == 0 {
            return Err(StoreError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(StoreError::Config(format!(
                "DATABASE_MIN_CONNECTIONS ({}) exceeds DATABASE_MAX_CONNECTIONS ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }

    pub fn connect_options(&self) -> StoreResult<PgConnectOptions> {
        let options: PgConnectOptions = self.url.parse()?;
        Ok(options.log_statements(self.log_statements))
    }

    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
    }

    /// Open a connection pool with these settings.
    pub async fn connect(&self) -> StoreResult<PgPool> {
        self.validate()?;
        let pool = self
            .pool_options()
            .connect_with(self.connect_options()?)
            .await?;

        log::info!(
            "database pool ready (max_connections={})",
            self.max_connections
        );
        Ok(pool)
    }
}
