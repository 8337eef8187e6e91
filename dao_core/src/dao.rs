//! Generic CRUD engine
//!
//! One DAO per entity type (or per hierarchy sharing a discriminator). Every
//! operation follows the same shape: borrow a pooled connection, compose or
//! reuse a cached statement, bind the parameter list, execute, map rows back
//! through the row loader, then release the handle — or invalidate it when
//! the operation failed and the connection state is questionable.

use crate::binding::{LoadContext, TableBinding};
use crate::entity::PrimaryKey;
use crate::errors::DaoError;
use crate::hooks::{Cascade, CascadeContext};
use crate::loaded::LoadedSet;
use crate::query::Query;
use crate::row_reader::RowReader;
use config::DatabaseConfig;
use conn_pool::{
    ConnectionPool, GeneratedKey, PooledConnection, SelectSpec, SqlRow, StatementKey, StatementOp,
};
use param_bind::ParamTypeRegistry;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct Dao<E: TableBinding> {
    pool: ConnectionPool,
    hooks: Option<Arc<dyn Cascade<E>>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: TableBinding> Clone for Dao<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            hooks: self.hooks.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: TableBinding> std::fmt::Debug for Dao<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dao")
            .field("table", &E::table())
            .field("has_hooks", &self.hooks.is_some())
            .finish()
    }
}

impl<E: TableBinding> Dao<E> {
    /// A DAO owning its own connection pool. Closing the DAO closes the pool.
    pub fn new(
        config: &DatabaseConfig,
        registry: Arc<ParamTypeRegistry>,
    ) -> Result<Self, DaoError> {
        Ok(Self::with_pool(ConnectionPool::new(config, registry)?))
    }

    /// A DAO sharing an existing pool, for hierarchies and sub-DAOs.
    pub fn with_pool(pool: ConnectionPool) -> Self {
        Self {
            pool,
            hooks: None,
            _entity: PhantomData,
        }
    }

    /// Attach cascade hooks.
    pub fn with_hooks(mut self, hooks: Arc<dyn Cascade<E>>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Close the DAO's pool; cached statements go with it.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Qualified projection: primary key first, then the non-key columns.
    fn projection() -> String {
        let table = E::table();
        let mut columns = Vec::with_capacity(E::columns().len() + 1);
        columns.push(format!("{}.{}", table, E::primary_column()));
        for column in E::columns() {
            columns.push(format!("{}.{}", table, column));
        }
        columns.join(", ")
    }

    fn select_spec(query: &Query) -> SelectSpec {
        SelectSpec {
            columns: Self::projection(),
            table: E::table().to_string(),
            join: query.join.clone(),
            where_clause: query.where_clause.clone(),
            order: query.order.clone(),
            limit: query.limit,
            offset: query.offset,
            discriminator: E::discriminator(),
        }
    }

    /// Release on success, invalidate on failure; every exit path hands the
    /// handle back to the pool.
    async fn settle<T>(
        &self,
        conn: PooledConnection,
        result: Result<T, conn_pool::PoolError>,
    ) -> Result<T, DaoError> {
        match result {
            Ok(value) => {
                self.pool.release(conn).await;
                Ok(value)
            }
            Err(e) => {
                self.pool.invalidate(conn).await;
                Err(e.into())
            }
        }
    }

    async fn fetch_rows(
        &self,
        spec: &SelectSpec,
        query: &Query,
        op: StatementOp,
    ) -> Result<Vec<SqlRow>, DaoError> {
        let key = query.cache_key.as_deref().map(|cache_key| StatementKey {
            op,
            table: E::table().to_string(),
            shape: Some(cache_key.to_string()),
        });
        let mut conn = self.pool.borrow().await?;
        let result = conn.select(spec, &query.params, key).await;
        self.settle(conn, result).await
    }

    async fn materialize(
        &self,
        rows: Vec<SqlRow>,
        loaded: &LoadedSet,
    ) -> Result<Vec<E>, DaoError> {
        let ctx = LoadContext::new(&self.pool, loaded);
        let mut entities = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut reader = RowReader::new(row);
            entities.push(E::from_row(&mut reader, &ctx).await?);
        }
        Ok(entities)
    }

    fn primary_filter() -> String {
        format!("{}.{}=?", E::table(), E::primary_column())
    }

    /// Load the single entity with this primary key.
    pub async fn load(&self, key: E::Key) -> Result<E, DaoError> {
        self.load_with(key, &LoadedSet::new()).await
    }

    /// Load by primary key, consulting the already-loaded set for recursive
    /// foreign-key resolution.
    pub async fn load_with(&self, key: E::Key, loaded: &LoadedSet) -> Result<E, DaoError> {
        let query = Query::new()
            .filter(&Self::primary_filter())
            .param(param_bind::Parameter::value(key.to_value()));
        self.load_one_where_with(query, loaded).await
    }

    /// Load every row of the entity's table (plus the discriminator filter
    /// when one is declared). Empty table gives an empty vec.
    pub async fn load_all(&self) -> Result<Vec<E>, DaoError> {
        self.load_all_where(Query::new()).await
    }

    /// Load all entities matching the query.
    pub async fn load_all_where(&self, query: Query) -> Result<Vec<E>, DaoError> {
        self.load_all_where_with(query, &LoadedSet::new()).await
    }

    pub async fn load_all_where_with(
        &self,
        query: Query,
        loaded: &LoadedSet,
    ) -> Result<Vec<E>, DaoError> {
        let spec = Self::select_spec(&query);
        let rows = self
            .fetch_rows(&spec, &query, StatementOp::Select)
            .await?;
        self.materialize(rows, loaded).await
    }

    /// Load exactly one entity matching the query; entry-not-found on an
    /// empty result. More than one match is not detected, the first row wins.
    pub async fn load_one_where(&self, query: Query) -> Result<E, DaoError> {
        self.load_one_where_with(query, &LoadedSet::new()).await
    }

    pub async fn load_one_where_with(
        &self,
        query: Query,
        loaded: &LoadedSet,
    ) -> Result<E, DaoError> {
        let description = query.describe(E::table());
        let mut entities = self.load_all_where_with(query, loaded).await?;
        if entities.is_empty() {
            return Err(DaoError::NotFound(description));
        }
        Ok(entities.swap_remove(0))
    }

    /// Count rows matching the query's join/where; limit and order are
    /// ignored so the count matches the unbounded load.
    pub async fn count_where(&self, query: Query) -> Result<i64, DaoError> {
        let spec = SelectSpec {
            columns: "COUNT(*) AS total".to_string(),
            table: E::table().to_string(),
            join: query.join.clone(),
            where_clause: query.where_clause.clone(),
            order: None,
            limit: None,
            offset: None,
            discriminator: E::discriminator(),
        };
        let rows = self.fetch_rows(&spec, &query, StatementOp::Count).await?;
        let row = rows
            .first()
            .ok_or_else(|| DaoError::NotFound(format!("count over {}", E::table())))?;
        Ok(row.read::<i64>(0)?.unwrap_or(0))
    }

    pub async fn count(&self) -> Result<i64, DaoError> {
        self.count_where(Query::new()).await
    }

    /// Insert the entity and assign its generated primary key.
    ///
    /// Precondition: no primary key set. The before-insert hook runs first so
    /// dependents holding the foreign key can be written; the after-insert
    /// hook runs once the generated key is assigned.
    pub async fn insert(&self, entity: &mut E) -> Result<(), DaoError> {
        self.insert_with(entity, &mut CascadeContext::new()).await
    }

    pub async fn insert_with(
        &self,
        entity: &mut E,
        ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        if entity.key().is_some() {
            return Err(DaoError::IllegalState(format!(
                "insert into {} with primary key already set",
                E::table()
            )));
        }
        if let Some(hooks) = &self.hooks {
            hooks.before_insert(entity, ctx).await?;
        }

        let params = entity.to_params();
        let discriminator = E::discriminator();
        let mut conn = self.pool.borrow().await?;
        let result = conn
            .insert(
                E::table(),
                E::columns(),
                discriminator.as_ref(),
                E::primary_column(),
                &params,
            )
            .await;
        let generated = self.settle(conn, result).await?;

        let key = match generated {
            GeneratedKey::Row(row) => E::Key::read(&row, 0)?
                .ok_or(DaoError::NoGeneratedKey { table: E::table() })?,
            GeneratedKey::Id(id) => E::Key::from_generated(id),
            GeneratedKey::Missing => {
                return Err(DaoError::NoGeneratedKey { table: E::table() })
            }
        };
        entity.primary_mut().assign(key)?;
        tracing::debug!(table = E::table(), key = ?key, "inserted");

        if let Some(hooks) = &self.hooks {
            hooks.after_insert(entity, ctx).await?;
        }
        Ok(())
    }

    /// Update the entity's row. Precondition: primary key set.
    pub async fn update(&self, entity: &mut E) -> Result<(), DaoError> {
        self.update_with(entity, &mut CascadeContext::new()).await
    }

    pub async fn update_with(
        &self,
        entity: &mut E,
        ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        let Some(key) = entity.key() else {
            return Err(DaoError::IllegalState(format!(
                "update of {} without primary key",
                E::table()
            )));
        };
        if let Some(hooks) = &self.hooks {
            hooks.before_update(entity, ctx).await?;
        }

        let params = entity.to_params();
        let discriminator = E::discriminator();
        let mut conn = self.pool.borrow().await?;
        let result = conn
            .update(
                E::table(),
                E::columns(),
                discriminator.as_ref(),
                E::primary_column(),
                &params,
                key.to_value(),
            )
            .await;
        self.settle(conn, result).await?;
        tracing::debug!(table = E::table(), key = ?key, "updated");

        if let Some(hooks) = &self.hooks {
            hooks.after_update(entity, ctx).await?;
        }
        Ok(())
    }

    /// Delete the entity's row and clear its primary key, marking it
    /// detached. Precondition: primary key set.
    pub async fn delete(&self, entity: &mut E) -> Result<(), DaoError> {
        self.delete_with(entity, &mut CascadeContext::new()).await
    }

    pub async fn delete_with(
        &self,
        entity: &mut E,
        ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        let Some(key) = entity.key() else {
            return Err(DaoError::IllegalState(format!(
                "delete from {} without primary key",
                E::table()
            )));
        };
        if let Some(hooks) = &self.hooks {
            hooks.before_delete(entity, ctx).await?;
        }

        let discriminator = E::discriminator();
        let mut conn = self.pool.borrow().await?;
        let result = conn
            .delete(
                E::table(),
                E::primary_column(),
                discriminator.as_ref(),
                key.to_value(),
            )
            .await;
        self.settle(conn, result).await?;
        entity.primary_mut().clear();
        tracing::debug!(table = E::table(), key = ?key, "deleted");

        if let Some(hooks) = &self.hooks {
            hooks.after_delete(entity, ctx).await?;
        }
        Ok(())
    }

    /// Insert or update, dispatched on primary-key presence.
    pub async fn save(&self, entity: &mut E) -> Result<(), DaoError> {
        self.save_with(entity, &mut CascadeContext::new()).await
    }

    pub async fn save_with(
        &self,
        entity: &mut E,
        ctx: &mut CascadeContext,
    ) -> Result<(), DaoError> {
        if entity.key().is_some() {
            self.update_with(entity, ctx).await
        } else {
            self.insert_with(entity, ctx).await
        }
    }
}
