//! Convenience re-exports for common RowHaus usage
//!
//! This prelude re-exports the most commonly used items from the RowHaus
//! ecosystem, making it easier to import everything you need with a single
//! use statement.
//!
//! # Example
//!
//! ```rust
//! use rowhaus::prelude::*;
//! ```

// Core RowHaus components
pub use crate::core::RowHaus;
pub use crate::errors::RowHausError;

// Re-export centralized config
pub use config::{AppConfig, DatabaseConfig, PoolPolicy, PoolSettings};

// Parameter binding
pub use param_bind::{
    BindError, Convertible, ParamAdapter, ParamTypeRegistry, Parameter, ParameterList, Resolved,
    SqlType, SqlValue,
};

// Pool and statement layer
pub use conn_pool::{
    ConnectionPool, Dialect, Discriminator, PoolError, PooledConnection, SelectSpec, SqlRow,
    StatementKey, StatementOp,
};

// DAO engines
pub use dao_core::{
    Cascade, CascadeContext, CrossDao, CrossDao3, CursorStore, Dao, DaoError, Entity, KeyRef,
    KeysetCursor, LoadContext, LoadedSet, Primary, PrimaryKey, PrimaryKind, Query, Relation2,
    Relation3, RowReader, TableBinding,
};

// Common external dependencies
pub use async_trait;
pub use sqlx;
pub use tokio;
