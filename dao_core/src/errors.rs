use conn_pool::PoolError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DaoError {
    /// A single-row load matched zero rows. Carries the filter description.
    #[error("entry not found: {0}")]
    NotFound(String),

    /// An operation precondition was violated; a caller logic error, never
    /// retryable.
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// The insert's generated-key cursor yielded no row.
    #[error("no generated key returned for insert into {table}")]
    NoGeneratedKey { table: &'static str },

    /// A stored primary-key value does not convert to the declared key type.
    #[error("unsupported primary-key value `{value}` for type {type_name}")]
    UnsupportedPrimaryType {
        type_name: &'static str,
        value: String,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
