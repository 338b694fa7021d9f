//! Membership of panels in multi-panels.
//!
//! `multi_panel_targets` is a plain join table. Rows disappear on their own
//! when the referenced multi-panel or panel is deleted (foreign key cascades),
//! so this store only handles explicit association changes.

use sqlx::{PgPool, Row};

use crate::error::{RowDecodeError, StoreResult};
use crate::models::{MultiPanelId, Panel};
use crate::rows::{RowSet, decode_rows, to_db_id};

#[derive(Debug, Clone)]
pub struct MultiPanelTargetStore {
    pool: PgPool,
}

impl MultiPanelTargetStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Panels that belong to a multi-panel, in storage order.
    pub async fn get_panels_for_multi_panel(
        &self,
        multi_panel_id: MultiPanelId,
    ) -> StoreResult<RowSet<Panel>> {
        let rows = sqlx::query(
            r#"
            SELECT
                panels.message_id, panels.channel_id, panels.guild_id, panels.title,
                panels.content, panels.colour, panels.target_category,
                panels.reaction_emote, panels.welcome_message
            FROM multi_panel_targets
            INNER JOIN panels ON panels.message_id = multi_panel_targets.panel_id
            WHERE multi_panel_targets.multi_panel_id = $1
            "#,
        )
        .bind(multi_panel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_rows(rows, "panel", Panel::from_row))
    }

    /// Ids of every multi-panel a panel is part of.
    pub async fn get_multi_panels_for_panel(
        &self,
        panel_id: u64,
    ) -> StoreResult<RowSet<MultiPanelId>> {
        let panel_id = to_db_id("panel_id", panel_id)?;

        let rows = sqlx::query(
            r#"SELECT "multi_panel_id" FROM multi_panel_targets WHERE "panel_id" = $1"#,
        )
        .bind(panel_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_rows(rows, "multi_panel_target", |row| {
            row.try_get::<MultiPanelId, _>("multi_panel_id")
                .map_err(RowDecodeError::from)
        }))
    }

    /// Add a panel to a multi-panel. Returns `false` if it was already a member.
    pub async fn associate(&self, multi_panel_id: MultiPanelId, panel_id: u64) -> StoreResult<bool> {
        let panel_id = to_db_id("panel_id", panel_id)?;

        let result = sqlx::query(
            r#"INSERT INTO multi_panel_targets ("multi_panel_id", "panel_id") VALUES ($1, $2) ON CONFLICT ("multi_panel_id", "panel_id") DO NOTHING"#,
        )
        .bind(multi_panel_id)
        .bind(panel_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove a panel from a multi-panel. Returns `false` if it was not a member.
    pub async fn dissociate(&self, multi_panel_id: MultiPanelId, panel_id: u64) -> StoreResult<bool> {
        let panel_id = to_db_id("panel_id", panel_id)?;

        let result = sqlx::query(
            r#"DELETE FROM multi_panel_targets WHERE "multi_panel_id" = $1 AND "panel_id" = $2"#,
        )
        .bind(multi_panel_id)
        .bind(panel_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Remove every panel from a multi-panel, returning how many were removed.
    pub async fn dissociate_all(&self, multi_panel_id: MultiPanelId) -> StoreResult<u64> {
        let result = sqlx::query(r#"DELETE FROM multi_panel_targets WHERE "multi_panel_id" = $1"#)
            .bind(multi_panel_id)
            .execute(&self.pool)
            .await?;

        log::debug!(
            "cleared {} panel(s) from multi-panel {}",
            result.rows_affected(),
            multi_panel_id
        );

        Ok(result.rows_affected())
    }
}
