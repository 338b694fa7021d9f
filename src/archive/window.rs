//! Keyset window over `modmail_archive`.
//!
//! A page is described by a [`Dimension`] (which archives) and a [`Window`]
//! (where the page sits relative to an anchor archive). The anchor id is
//! resolved to its `close_time` by a correlated subquery carrying the same
//! dimension filter, so an anchor outside the dimension resolves to NULL and
//! the page comes back empty.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::rows::to_db_id;

pub(crate) const ARCHIVE_COLUMNS: &str = r#""uuid", "guild_id", "user_id", "close_time""#;

/// Which archives a listing is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dimension {
    Guild { guild_id: i64 },
    User { user_id: i64 },
    Member { guild_id: i64, user_id: i64 },
}

impl Dimension {
    pub(crate) fn guild(guild_id: u64) -> StoreResult<Self> {
        Ok(Self::Guild {
            guild_id: to_db_id("guild_id", guild_id)?,
        })
    }

    pub(crate) fn user(user_id: u64) -> StoreResult<Self> {
        Ok(Self::User {
            user_id: to_db_id("user_id", user_id)?,
        })
    }

    pub(crate) fn member(guild_id: u64, user_id: u64) -> StoreResult<Self> {
        Ok(Self::Member {
            guild_id: to_db_id("guild_id", guild_id)?,
            user_id: to_db_id("user_id", user_id)?,
        })
    }

    fn push_filter(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match *self {
            Dimension::Guild { guild_id } => {
                qb.push(r#""guild_id" = "#).push_bind(guild_id);
            }
            Dimension::User { user_id } => {
                qb.push(r#""user_id" = "#).push_bind(user_id);
            }
            Dimension::Member { guild_id, user_id } => {
                qb.push(r#""guild_id" = "#)
                    .push_bind(guild_id)
                    .push(r#" AND "user_id" = "#)
                    .push_bind(user_id);
            }
        }
    }
}

/// Position of a page relative to an anchor archive.
///
/// Pages are always sorted newest first; the window only decides which side of
/// the anchor's `close_time` is returned. The anchor itself, and anything
/// closed at exactly the same instant, is never part of the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// The most recently closed archives.
    Latest,
    /// Archives closed strictly after the anchor.
    Newer(Uuid),
    /// Archives closed strictly before the anchor.
    Older(Uuid),
}

impl Window {
    /// Build a window from the optional `after`/`before` cursor pair.
    ///
    /// The two cursors point in opposite directions, so supplying both is
    /// rejected rather than resolved by precedence.
    pub fn from_cursors(after: Option<Uuid>, before: Option<Uuid>) -> StoreResult<Self> {
        match (after, before) {
            (Some(_), Some(_)) => Err(StoreError::ConflictingCursors),
            (Some(anchor), None) => Ok(Window::Newer(anchor)),
            (None, Some(anchor)) => Ok(Window::Older(anchor)),
            (None, None) => Ok(Window::Latest),
        }
    }

    pub fn anchor(&self) -> Option<Uuid> {
        match *self {
            Window::Latest => None,
            Window::Newer(anchor) | Window::Older(anchor) => Some(anchor),
        }
    }

    fn comparison(&self) -> Option<&'static str> {
        match self {
            Window::Latest => None,
            Window::Newer(_) => Some(" > "),
            Window::Older(_) => Some(" < "),
        }
    }
}

/// Compose the single statement that fetches one page.
pub(crate) fn page_query(
    dimension: Dimension,
    window: Window,
    limit: u32,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT {} FROM modmail_archive WHERE ",
        ARCHIVE_COLUMNS
    ));
    dimension.push_filter(&mut qb);

    if let (Some(op), Some(anchor)) = (window.comparison(), window.anchor()) {
        qb.push(r#" AND "close_time""#)
            .push(op)
            .push(r#"(SELECT "close_time" FROM modmail_archive WHERE "uuid" = "#)
            .push_bind(anchor)
            .push(" AND ");
        dimension.push_filter(&mut qb);
        qb.push(" LIMIT 1)");
    }

    qb.push(r#" ORDER BY "close_time" DESC, "uuid" DESC LIMIT "#)
        .push_bind(i64::from(limit));

    qb
}
