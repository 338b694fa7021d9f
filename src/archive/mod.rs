//! Closed modmail thread archives.
//!
//! Archives are written once and listed newest first by guild, by user, or by
//! guild and user together. Listings page with keyset cursors: the caller
//! passes the id of an archive it has already seen and gets the archives
//! closed strictly after (`after`) or strictly before (`before`) it.

mod window;

pub use window::Window;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::ArchiveRecord;
use crate::rows::{RowSet, decode_rows, to_db_id};
use window::{ARCHIVE_COLUMNS, Dimension, page_query};

#[derive(Debug, Clone)]
pub struct ModmailArchiveStore {
    pool: PgPool,
}

impl ModmailArchiveStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Fetch a single archive. A missing archive is `Ok(None)`.
    pub async fn get(&self, id: Uuid) -> StoreResult<Option<ArchiveRecord>> {
        let sql = format!(
            r#"SELECT {} FROM modmail_archive WHERE "uuid" = $1"#,
            ARCHIVE_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(ArchiveRecord::from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Store an archive unless one with the same id already exists.
    ///
    /// Returns `false` when the id was already present; the stored row is left
    /// untouched in that case, so retrying after an ambiguous failure is safe.
    /// Sub-microsecond digits of `close_time` are not stored.
    pub async fn insert(&self, archive: &ArchiveRecord) -> StoreResult<bool> {
        let guild_id = to_db_id("guild_id", archive.guild_id)?;
        let user_id = to_db_id("user_id", archive.user_id)?;

        let result = sqlx::query(
            r#"INSERT INTO modmail_archive ("uuid", "guild_id", "user_id", "close_time") VALUES ($1, $2, $3, $4) ON CONFLICT ("uuid") DO NOTHING"#,
        )
        .bind(archive.id)
        .bind(guild_id)
        .bind(user_id)
        .bind(archive.close_time)
        .execute(&self.pool)
        .await?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            log::debug!("modmail archive {} already stored, skipping insert", archive.id);
        }

        Ok(inserted)
    }

    /// Archives of one guild, newest first.
    pub async fn list_by_guild(
        &self,
        guild_id: u64,
        limit: u32,
        after: Option<Uuid>,
        before: Option<Uuid>,
    ) -> StoreResult<RowSet<ArchiveRecord>> {
        let window = Window::from_cursors(after, before)?;
        self.fetch_page(Dimension::guild(guild_id)?, window, limit)
            .await
    }

    /// Archives of one user across every guild, newest first.
    ///
    /// Only the `after` cursor exists for this listing, and like the other
    /// listings it selects archives closed strictly later than the anchor. A
    /// caller can therefore refresh towards newer archives but cannot page past
    /// the first `limit` rows towards older ones.
    pub async fn list_by_user(
        &self,
        user_id: u64,
        limit: u32,
        after: Option<Uuid>,
    ) -> StoreResult<RowSet<ArchiveRecord>> {
        let window = Window::from_cursors(after, None)?;
        self.fetch_page(Dimension::user(user_id)?, window, limit)
            .await
    }

    /// Archives of one user within one guild, newest first.
    pub async fn list_by_guild_and_user(
        &self,
        guild_id: u64,
        user_id: u64,
        limit: u32,
        after: Option<Uuid>,
        before: Option<Uuid>,
    ) -> StoreResult<RowSet<ArchiveRecord>> {
        let window = Window::from_cursors(after, before)?;
        self.fetch_page(Dimension::member(guild_id, user_id)?, window, limit)
            .await
    }

    async fn fetch_page(
        &self,
        dimension: Dimension,
        window: Window,
        limit: u32,
    ) -> StoreResult<RowSet<ArchiveRecord>> {
        log::debug!(
            "fetching modmail archive page: {:?} {:?} limit={}",
            dimension,
            window,
            limit
        );

        let mut query = page_query(dimension, window, limit);
        let rows = query.build().fetch_all(&self.pool).await?;

        Ok(decode_rows(rows, "modmail_archive", ArchiveRecord::from_row))
    }
}
