//! Connection pooling and prepared-statement lifecycle for RowHaus
//!
//! This crate owns the physical side of the access layer: database dialect
//! detection, the per-database raw connection dispatch, composition of
//! parameterized SQL (JOIN/WHERE/LIMIT/ORDER with null-safe predicates and
//! dialect placeholder numbering), the per-connection statement cache keyed by
//! structured [`StatementKey`]s, and the borrow/release/invalidate pool.

pub mod dialect;
pub mod errors;
pub mod pool;
pub mod pooled;
pub mod raw;
pub mod statement;

pub use dialect::Dialect;
pub use errors::PoolError;
pub use pool::ConnectionPool;
pub use pooled::{GeneratedKey, PooledConnection};
pub use raw::{ExecResult, RawConnection, SqlRow};
pub use statement::{
    compose_delete, compose_insert, compose_select, compose_update, number_placeholders,
    rewrite_nullable_where, Discriminator, SelectSpec, StatementKey, StatementOp,
};
