//! Table binding contract
//!
//! Each entity type declares its physical mapping: table name, primary-key
//! column, non-key columns, optional discriminator, and the two mapping
//! directions (entity to parameter list, row to entity). Row materialization
//! receives a [`LoadContext`] for recursive foreign-key resolution through
//! the already-loaded object set.

use crate::dao::Dao;
use crate::entity::Entity;
use crate::errors::DaoError;
use crate::loaded::LoadedSet;
use crate::row_reader::RowReader;
use async_trait::async_trait;
use conn_pool::{ConnectionPool, Discriminator};
use param_bind::ParameterList;

/// Physical table mapping for an entity type.
#[async_trait]
pub trait TableBinding: Entity + Sized {
    /// The table name in the database
    fn table() -> &'static str;

    /// The primary-key column
    fn primary_column() -> &'static str;

    /// Non-key columns, in binding order
    fn columns() -> &'static [&'static str];

    /// Discriminator for single-table inheritance; `None` for plain tables
    fn discriminator() -> Option<Discriminator> {
        None
    }

    /// Non-key column values, in [`columns`](TableBinding::columns) order
    fn to_params(&self) -> ParameterList;

    /// Materialize one row. The reader is positioned at the primary-key
    /// column, followed by the non-key columns in declaration order.
    async fn from_row(
        reader: &mut RowReader<'_>,
        ctx: &LoadContext<'_>,
    ) -> Result<Self, DaoError>;
}

/// Context available while materializing rows: the caller's already-loaded
/// set and the pool recursive loads go through.
pub struct LoadContext<'a> {
    pool: &'a ConnectionPool,
    loaded: &'a LoadedSet,
}

impl<'a> LoadContext<'a> {
    pub fn new(pool: &'a ConnectionPool, loaded: &'a LoadedSet) -> Self {
        Self { pool, loaded }
    }

    pub fn loaded(&self) -> &LoadedSet {
        self.loaded
    }

    /// A DAO sharing this context's pool, for recursive loads.
    pub fn dao<E: TableBinding>(&self) -> Dao<E> {
        Dao::with_pool(self.pool.clone())
    }

    /// Resolve a referenced entity by key: from the already-loaded set when
    /// present, otherwise through a fresh load against the entity's own DAO.
    /// This is the recursive resolution path; redundant queries within one
    /// top-level call are avoided only as far as the loaded set reaches.
    pub async fn resolve<E: TableBinding>(
        &self,
        key: Option<E::Key>,
    ) -> Result<Option<E>, DaoError> {
        let Some(key) = key else {
            return Ok(None);
        };
        if let Some(found) = self.loaded.find::<E>(key) {
            tracing::debug!(table = E::table(), key = ?key, "resolved from loaded set");
            return Ok(Some(found));
        }
        self.dao::<E>().load_with(key, self.loaded).await.map(Some)
    }
}
