//! Raw connection dispatch
//!
//! One enum over the per-database driver connections, so the pool and the
//! statement layer stay dialect-generic. Values are bound from the reduced
//! [`SqlValue`] forms; rows come back behind the dialect-erased [`SqlRow`].

use crate::dialect::Dialect;
use crate::errors::PoolError;
use param_bind::{SqlType, SqlValue};
use sqlx::mysql::{MySqlConnection, MySqlRow};
use sqlx::postgres::{PgConnection, PgRow};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{ConnectOptions, Connection, Row};
use std::str::FromStr;

/// Outcome of a non-query statement.
#[derive(Debug, Clone, Copy)]
pub struct ExecResult {
    pub rows_affected: u64,
    /// Generated key for dialects that report one on the statement itself
    pub last_insert_id: Option<i64>,
}

/// A row from any of the supported drivers.
pub enum SqlRow {
    Postgres(PgRow),
    MySql(MySqlRow),
    Sqlite(SqliteRow),
}

impl SqlRow {
    /// Null-aware positional read.
    pub fn read<T>(&self, index: usize) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> sqlx::Decode<'r, sqlx::Postgres>
            + for<'r> sqlx::Decode<'r, sqlx::MySql>
            + for<'r> sqlx::Decode<'r, sqlx::Sqlite>
            + sqlx::Type<sqlx::Postgres>
            + sqlx::Type<sqlx::MySql>
            + sqlx::Type<sqlx::Sqlite>,
    {
        match self {
            SqlRow::Postgres(row) => row.try_get::<Option<T>, _>(index),
            SqlRow::MySql(row) => row.try_get::<Option<T>, _>(index),
            SqlRow::Sqlite(row) => row.try_get::<Option<T>, _>(index),
        }
    }

    /// Number of columns in the row.
    pub fn width(&self) -> usize {
        match self {
            SqlRow::Postgres(row) => row.len(),
            SqlRow::MySql(row) => row.len(),
            SqlRow::Sqlite(row) => row.len(),
        }
    }
}

impl std::fmt::Debug for SqlRow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dialect = match self {
            SqlRow::Postgres(_) => "PostgreSQL",
            SqlRow::MySql(_) => "MySQL",
            SqlRow::Sqlite(_) => "SQLite",
        };
        f.debug_struct("SqlRow")
            .field("dialect", &dialect)
            .field("width", &self.width())
            .finish()
    }
}

// Binds reduced values onto a query; shared across the three drivers since
// the query types differ only in their database parameter.
macro_rules! bind_values {
    ($query:expr, $values:expr) => {{
        let mut query = $query;
        for value in $values {
            query = match value {
                SqlValue::Null(ty) => match ty {
                    SqlType::Bool => query.bind(Option::<bool>::None),
                    SqlType::SmallInt => query.bind(Option::<i16>::None),
                    SqlType::Int => query.bind(Option::<i32>::None),
                    SqlType::BigInt => query.bind(Option::<i64>::None),
                    SqlType::Real => query.bind(Option::<f32>::None),
                    SqlType::Double => query.bind(Option::<f64>::None),
                    SqlType::Text => query.bind(Option::<String>::None),
                    SqlType::Blob => query.bind(Option::<Vec<u8>>::None),
                    SqlType::DateTime => query.bind(Option::<chrono::NaiveDateTime>::None),
                    SqlType::TimestampTz => {
                        query.bind(Option::<chrono::DateTime<chrono::Utc>>::None)
                    }
                },
                SqlValue::Bool(v) => query.bind(v),
                SqlValue::SmallInt(v) => query.bind(v),
                SqlValue::Int(v) => query.bind(v),
                SqlValue::BigInt(v) => query.bind(v),
                SqlValue::Real(v) => query.bind(v),
                SqlValue::Double(v) => query.bind(v),
                SqlValue::Text(v) => query.bind(v),
                SqlValue::Blob(v) => query.bind(v),
                SqlValue::DateTime(v) => query.bind(v),
                SqlValue::TimestampTz(v) => query.bind(v),
            };
        }
        query
    }};
}

/// A physical database connection behind the dialect dispatch.
pub enum RawConnection {
    Postgres(PgConnection),
    MySql(MySqlConnection),
    Sqlite(SqliteConnection),
}

impl RawConnection {
    /// Open a physical connection for the dialect.
    pub async fn connect(dialect: Dialect, url: &str) -> Result<Self, PoolError> {
        tracing::debug!(dialect = dialect.display_name(), "opening connection");
        match dialect {
            Dialect::PostgreSQL => Ok(RawConnection::Postgres(PgConnection::connect(url).await?)),
            Dialect::MySQL => Ok(RawConnection::MySql(MySqlConnection::connect(url).await?)),
            Dialect::SQLite => {
                let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
                Ok(RawConnection::Sqlite(options.connect().await?))
            }
            Dialect::Unknown => Err(PoolError::UnknownDialect {
                url: url.to_string(),
            }),
        }
    }

    /// Liveness probe; a failed ping means the handle is invalid.
    pub async fn ping(&mut self) -> Result<(), sqlx::Error> {
        match self {
            RawConnection::Postgres(conn) => conn.ping().await,
            RawConnection::MySql(conn) => conn.ping().await,
            RawConnection::Sqlite(conn) => conn.ping().await,
        }
    }

    /// Drop every server-side prepared statement cached on this connection.
    pub async fn clear_statements(&mut self) -> Result<(), sqlx::Error> {
        match self {
            RawConnection::Postgres(conn) => conn.clear_cached_statements().await,
            RawConnection::MySql(conn) => conn.clear_cached_statements().await,
            RawConnection::Sqlite(conn) => conn.clear_cached_statements().await,
        }
    }

    /// Close the physical connection.
    pub async fn close(self) -> Result<(), sqlx::Error> {
        match self {
            RawConnection::Postgres(conn) => conn.close().await,
            RawConnection::MySql(conn) => conn.close().await,
            RawConnection::Sqlite(conn) => conn.close().await,
        }
    }

    /// Execute a non-query statement.
    pub async fn execute(
        &mut self,
        sql: &str,
        values: Vec<SqlValue>,
        persistent: bool,
    ) -> Result<ExecResult, sqlx::Error> {
        match self {
            RawConnection::Postgres(conn) => {
                let query = bind_values!(sqlx::query(sql).persistent(persistent), values);
                let result = query.execute(&mut *conn).await?;
                Ok(ExecResult {
                    rows_affected: result.rows_affected(),
                    last_insert_id: None,
                })
            }
            RawConnection::MySql(conn) => {
                let query = bind_values!(sqlx::query(sql).persistent(persistent), values);
                let result = query.execute(&mut *conn).await?;
                let id = result.last_insert_id();
                Ok(ExecResult {
                    rows_affected: result.rows_affected(),
                    last_insert_id: (id != 0).then_some(id as i64),
                })
            }
            RawConnection::Sqlite(conn) => {
                let query = bind_values!(sqlx::query(sql).persistent(persistent), values);
                let result = query.execute(&mut *conn).await?;
                let id = result.last_insert_rowid();
                Ok(ExecResult {
                    rows_affected: result.rows_affected(),
                    last_insert_id: (id != 0).then_some(id),
                })
            }
        }
    }

    /// Fetch every row of a query.
    pub async fn fetch_all(
        &mut self,
        sql: &str,
        values: Vec<SqlValue>,
        persistent: bool,
    ) -> Result<Vec<SqlRow>, sqlx::Error> {
        match self {
            RawConnection::Postgres(conn) => {
                let query = bind_values!(sqlx::query(sql).persistent(persistent), values);
                let rows = query.fetch_all(&mut *conn).await?;
                Ok(rows.into_iter().map(SqlRow::Postgres).collect())
            }
            RawConnection::MySql(conn) => {
                let query = bind_values!(sqlx::query(sql).persistent(persistent), values);
                let rows = query.fetch_all(&mut *conn).await?;
                Ok(rows.into_iter().map(SqlRow::MySql).collect())
            }
            RawConnection::Sqlite(conn) => {
                let query = bind_values!(sqlx::query(sql).persistent(persistent), values);
                let rows = query.fetch_all(&mut *conn).await?;
                Ok(rows.into_iter().map(SqlRow::Sqlite).collect())
            }
        }
    }

    /// Fetch at most one row of a query.
    pub async fn fetch_optional(
        &mut self,
        sql: &str,
        values: Vec<SqlValue>,
        persistent: bool,
    ) -> Result<Option<SqlRow>, sqlx::Error> {
        match self {
            RawConnection::Postgres(conn) => {
                let query = bind_values!(sqlx::query(sql).persistent(persistent), values);
                Ok(query
                    .fetch_optional(&mut *conn)
                    .await?
                    .map(SqlRow::Postgres))
            }
            RawConnection::MySql(conn) => {
                let query = bind_values!(sqlx::query(sql).persistent(persistent), values);
                Ok(query.fetch_optional(&mut *conn).await?.map(SqlRow::MySql))
            }
            RawConnection::Sqlite(conn) => {
                let query = bind_values!(sqlx::query(sql).persistent(persistent), values);
                Ok(query.fetch_optional(&mut *conn).await?.map(SqlRow::Sqlite))
            }
        }
    }

    /// Run a raw statement without parameters, for DDL scripts.
    pub async fn execute_raw(&mut self, sql: &str) -> Result<(), sqlx::Error> {
        self.execute(sql, Vec::new(), false).await.map(|_| ())
    }
}
