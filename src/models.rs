use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::error::RowDecodeError;
use crate::rows::from_db_id;

/// Identifier of a multi-panel (`multi_panels.id`, an `INT4` serial).
pub type MultiPanelId = i32;

// ===== Modmail Archive =====

/// A closed modmail thread. Written once when the thread closes, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveRecord {
    pub id: Uuid,
    pub guild_id: u64,
    pub user_id: u64,
    pub close_time: DateTime<Utc>,
}

impl ArchiveRecord {
    /// `close_time` is cut to whole microseconds, the precision Postgres keeps,
    /// so the record compares equal to what a later `get` returns.
    pub fn new(id: Uuid, guild_id: u64, user_id: u64, close_time: DateTime<Utc>) -> Self {
        Self {
            id,
            guild_id,
            user_id,
            close_time: close_time.trunc_subsecs(6),
        }
    }

    pub(crate) fn from_row(row: &PgRow) -> Result<Self, RowDecodeError> {
        Ok(Self {
            id: row.try_get("uuid")?,
            guild_id: from_db_id("guild_id", row.try_get("guild_id")?)?,
            user_id: from_db_id("user_id", row.try_get("user_id")?)?,
            close_time: row.try_get("close_time")?,
        })
    }
}

// ===== Panels =====

/// Read model of a panel, as returned through the multi-panel association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Panel {
    pub message_id: u64,
    pub channel_id: u64,
    pub guild_id: u64,
    pub title: String,
    pub content: String,
    pub colour: i32,
    pub target_category: u64,
    pub reaction_emote: String,
    pub welcome_message: Option<String>,
}

impl Panel {
    pub(crate) fn from_row(row: &PgRow) -> Result<Self, RowDecodeError> {
        Ok(Self {
            message_id: from_db_id("message_id", row.try_get("message_id")?)?,
            channel_id: from_db_id("channel_id", row.try_get("channel_id")?)?,
            guild_id: from_db_id("guild_id", row.try_get("guild_id")?)?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            colour: row.try_get("colour")?,
            target_category: from_db_id("target_category", row.try_get("target_category")?)?,
            reaction_emote: row.try_get("reaction_emote")?,
            welcome_message: row.try_get("welcome_message")?,
        })
    }
}
