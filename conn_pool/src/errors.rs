use param_bind::BindError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    /// Uniform wrapper for any driver-level failure; the root cause stays
    /// attached for diagnostics.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("timed out after {waited_ms} ms waiting for a pooled connection")]
    Timeout { waited_ms: u64 },

    #[error("connection pool is closed")]
    Closed,

    #[error("unknown database dialect in url: {url}")]
    UnknownDialect { url: String },

    /// A parameter failed to reduce to a bindable value. Position is
    /// 1-based; the column name is a best-effort parse of the statement text.
    #[error("parameter {position} (column `{column}`) of statement `{statement}`: {source}")]
    Bind {
        statement: String,
        position: usize,
        column: String,
        source: BindError,
    },
}
