use sqlx::migrate::MigrateError;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure reported by a store operation.
///
/// "No rows" is never an error: single-row reads return `None` and listings
/// return an empty [`RowSet`](crate::rows::RowSet).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] MigrateError),
    #[error("row decode error: {0}")]
    Decode(#[from] RowDecodeError),
    #[error("both `after` and `before` cursors were supplied")]
    ConflictingCursors,
    #[error("{field} {value} does not fit in a signed 64-bit column")]
    IdOutOfRange { field: &'static str, value: u64 },
    #[error("configuration error: {0}")]
    Config(String),
}

/// A single row that could not be turned into its record type.
///
/// Listing operations skip such rows and keep going; the errors are handed
/// back alongside the rows that did decode.
#[derive(Debug, Error)]
pub enum RowDecodeError {
    #[error("column decode failed: {0}")]
    Column(#[from] sqlx::Error),
    #[error("column `{column}` holds negative id {value}")]
    NegativeId { column: &'static str, value: i64 },
}
