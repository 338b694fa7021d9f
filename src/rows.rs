//! Row-level decoding shared by the stores.
//!
//! Discord snowflakes are unsigned 64-bit values but Postgres only has a signed
//! `INT8`. Ids are checked on the way in and on the way out instead of being
//! silently reinterpreted.

use sqlx::postgres::PgRow;

use crate::error::{RowDecodeError, StoreError, StoreResult};

/// Rows decoded from one statement, plus the rows that were skipped.
#[derive(Debug)]
pub struct RowSet<T> {
    rows: Vec<T>,
    skipped: Vec<RowDecodeError>,
}

impl<T> RowSet<T> {
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    pub fn skipped(&self) -> &[RowDecodeError] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// True when no row was dropped while decoding.
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

impl<T> Default for RowSet<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> IntoIterator for RowSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<T> FromIterator<Result<T, RowDecodeError>> for RowSet<T> {
    fn from_iter<I: IntoIterator<Item = Result<T, RowDecodeError>>>(iter: I) -> Self {
        let mut set = RowSet::default();
        for item in iter {
            match item {
                Ok(row) => set.rows.push(row),
                Err(err) => set.skipped.push(err),
            }
        }
        set
    }
}

/// Decode every row with `decode`, logging and skipping the ones that fail.
pub(crate) fn decode_rows<T, F>(rows: Vec<PgRow>, entity: &'static str, decode: F) -> RowSet<T>
where
    F: Fn(&PgRow) -> Result<T, RowDecodeError>,
{
    let set: RowSet<T> = rows.iter().map(decode).collect();

    for err in set.skipped() {
        log::warn!("skipping undecodable {} row: {}", entity, err);
    }

    set
}

pub(crate) fn to_db_id(field: &'static str, value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::IdOutOfRange { field, value })
}

pub(crate) fn from_db_id(column: &'static str, value: i64) -> Result<u64, RowDecodeError> {
    u64::try_from(value).map_err(|_| RowDecodeError::NegativeId { column, value })
}
