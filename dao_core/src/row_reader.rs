//! Positional row loader
//!
//! A cursor-advancing accessor over one result row, with null-aware readers
//! for each primitive kind. Recursive object resolution goes through
//! [`crate::binding::LoadContext::resolve`].

use crate::entity::PrimaryKey;
use crate::errors::DaoError;
use chrono::{DateTime, NaiveDateTime, Utc};
use conn_pool::SqlRow;

pub struct RowReader<'r> {
    row: &'r SqlRow,
    position: usize,
}

impl<'r> RowReader<'r> {
    pub fn new(row: &'r SqlRow) -> Self {
        Self { row, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Skip one column without reading it.
    pub fn skip(&mut self) {
        self.position += 1;
    }

    fn take<T>(&mut self) -> Result<Option<T>, DaoError>
    where
        T: for<'a> sqlx::Decode<'a, sqlx::Postgres>
            + for<'a> sqlx::Decode<'a, sqlx::MySql>
            + for<'a> sqlx::Decode<'a, sqlx::Sqlite>
            + sqlx::Type<sqlx::Postgres>
            + sqlx::Type<sqlx::MySql>
            + sqlx::Type<sqlx::Sqlite>,
    {
        let value = self.row.read::<T>(self.position)?;
        self.position += 1;
        Ok(value)
    }

    pub fn next_bool(&mut self) -> Result<Option<bool>, DaoError> {
        self.take()
    }

    pub fn next_small_int(&mut self) -> Result<Option<i16>, DaoError> {
        self.take()
    }

    pub fn next_int(&mut self) -> Result<Option<i32>, DaoError> {
        self.take()
    }

    pub fn next_big_int(&mut self) -> Result<Option<i64>, DaoError> {
        self.take()
    }

    pub fn next_real(&mut self) -> Result<Option<f32>, DaoError> {
        self.take()
    }

    pub fn next_double(&mut self) -> Result<Option<f64>, DaoError> {
        self.take()
    }

    pub fn next_text(&mut self) -> Result<Option<String>, DaoError> {
        self.take()
    }

    pub fn next_blob(&mut self) -> Result<Option<Vec<u8>>, DaoError> {
        self.take()
    }

    pub fn next_date_time(&mut self) -> Result<Option<NaiveDateTime>, DaoError> {
        self.take()
    }

    pub fn next_timestamp_tz(&mut self) -> Result<Option<DateTime<Utc>>, DaoError> {
        self.take()
    }

    /// Read a primary-key column, decoded per the key type's kind.
    pub fn next_primary<K: PrimaryKey>(&mut self) -> Result<Option<K>, DaoError> {
        let value = K::read(self.row, self.position)?;
        self.position += 1;
        Ok(value)
    }
}
